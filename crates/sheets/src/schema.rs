use std::collections::HashMap;

/// Raw column headers that map onto `ProductRecord` fields for one sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMap {
    pub code: String,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub stock: String,
    pub price: String,
    pub description: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            code: "Código".to_string(),
            brand: "Marca".to_string(),
            model: "Modelo".to_string(),
            color: "Color".to_string(),
            stock: "Cantidad".to_string(),
            price: "Precio".to_string(),
            description: "Descripción".to_string(),
        }
    }
}

/// Declarative layout of one source sheet: where the header row sits
/// (1-based) and which raw headers feed each field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetSchema {
    pub header_row: usize,
    pub columns: ColumnMap,
}

impl Default for SheetSchema {
    fn default() -> Self {
        Self { header_row: 1, columns: ColumnMap::default() }
    }
}

/// Maps sheet titles to their schemas. Unknown sheets resolve to the
/// default schema, so every configured sheet always has a layout.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, SheetSchema>,
    fallback: SheetSchema,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layouts of the sheets the shop actually maintains. Each tab grew its
    /// own column names and header position over time; this table is the
    /// single place that knowledge lives.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.insert("Armazones", SheetSchema::default());

        registry.insert(
            "Anteojos de Sol",
            SheetSchema {
                header_row: 2,
                columns: ColumnMap {
                    stock: "Stock".to_string(),
                    description: "Detalle".to_string(),
                    ..ColumnMap::default()
                },
            },
        );

        registry.insert(
            "Lentes de Contacto",
            SheetSchema {
                header_row: 1,
                columns: ColumnMap {
                    code: "Cod".to_string(),
                    price: "Precio Lista".to_string(),
                    ..ColumnMap::default()
                },
            },
        );

        registry.insert(
            "Líquidos",
            SheetSchema {
                header_row: 3,
                columns: ColumnMap {
                    model: "Producto".to_string(),
                    stock: "Unidades".to_string(),
                    description: "Observaciones".to_string(),
                    ..ColumnMap::default()
                },
            },
        );

        registry.insert("Accesorios", SheetSchema::default());

        registry
    }

    pub fn insert(&mut self, sheet_title: impl Into<String>, schema: SheetSchema) {
        self.schemas.insert(sheet_title.into(), schema);
    }

    pub fn resolve(&self, sheet_title: &str) -> &SheetSchema {
        self.schemas.get(sheet_title).unwrap_or(&self.fallback)
    }
}
