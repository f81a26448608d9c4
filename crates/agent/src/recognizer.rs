use optibot_core::Intent;

/// Marker token for explicit code lookups ("#stock AR-01").
pub const CODE_LOOKUP_MARKER: &str = "#stock";

/// Ordered rule table: the first rule whose keyword set matches wins.
/// The order is deliberate configuration, not an accident of conditionals:
/// the explicit lookup marker and emergency signals outrank everything,
/// and specific categories (contact lenses, liquids) outrank the generic
/// product/price/stock buckets. Keywords are matched as lower-case
/// substrings against the normalized message.
const RULES: &[(Intent, &[&str])] = &[
    (Intent::StockByCode, &[CODE_LOOKUP_MARKER]),
    (
        Intent::Emergency,
        &[
            "me duele",
            "dolor de ojo",
            "urgencia",
            "emergencia",
            "me lastim",
            "golpe en el ojo",
            "infección",
            "infeccion",
            "no veo nada",
        ],
    ),
    (
        Intent::Greeting,
        &[
            "hola",
            "buen día",
            "buen dia",
            "buenos días",
            "buenos dias",
            "buenas tardes",
            "buenas noches",
            "qué tal",
            "que tal",
        ],
    ),
    (Intent::Farewell, &["chau", "adiós", "adios", "hasta luego", "nos vemos", "gracias"]),
    (
        Intent::HoursInquiry,
        &["horario", "a qué hora", "a que hora", "abren", "cierran", "abierto"],
    ),
    (
        Intent::LocationInquiry,
        &[
            "dónde están",
            "donde estan",
            "dónde queda",
            "donde queda",
            "dirección",
            "direccion",
            "ubicación",
            "ubicacion",
            "cómo llego",
            "como llego",
            "sucursal",
        ],
    ),
    (Intent::InsuranceInquiry, &["obra social", "obras sociales", "prepaga", "cobertura"]),
    (
        Intent::ContactLensInquiry,
        &["lentes de contacto", "lente de contacto", "lentillas", "descartables"],
    ),
    (
        Intent::LiquidsInquiry,
        &["líquido", "liquido", "solución", "solucion", "gotas", "multipropósito", "multiproposito"],
    ),
    (Intent::BrandInquiry, &["qué marcas", "que marcas", "marcas", "marca"]),
    (
        Intent::PriceInquiry,
        &[
            "precio",
            "cuánto sale",
            "cuanto sale",
            "cuánto cuesta",
            "cuanto cuesta",
            "cuánto valen",
            "cuanto valen",
            "valor",
        ],
    ),
    (
        Intent::StockInquiry,
        &["stock", "tienen", "tenés", "tenes", "hay", "disponible", "disponibilidad", "queda"],
    ),
    (
        Intent::ProductInquiry,
        &[
            "anteojo",
            "lente",
            "gafas",
            "armazón",
            "armazon",
            "marcos",
            "de sol",
            "recetado",
            "busco",
            "modelo",
        ],
    ),
];

/// Keyword-based classifier and slot extractor. Pure functions of the
/// message text; the only state is the configured insurance provider list.
#[derive(Clone, Debug, Default)]
pub struct IntentRecognizer {
    insurance_providers: Vec<String>,
}

impl IntentRecognizer {
    pub fn new(insurance_providers: Vec<String>) -> Self {
        Self { insurance_providers }
    }

    pub fn classify(&self, message: &str) -> Intent {
        let normalized = message.trim().to_lowercase();
        if normalized.is_empty() {
            return Intent::Unknown;
        }

        for (intent, keywords) in RULES {
            let mut matched = keywords.iter().any(|keyword| normalized.contains(keyword));
            // A bare provider name ("¿atienden OSDE?") is an insurance
            // question even without the generic keywords.
            if !matched && *intent == Intent::InsuranceInquiry {
                matched = self.provider_mentioned(&normalized);
            }
            if matched {
                return *intent;
            }
        }

        Intent::Unknown
    }

    /// Returns the token following the lookup marker, verbatim.
    pub fn extract_code(&self, message: &str) -> Option<String> {
        let mut tokens = message.split_whitespace();
        while let Some(token) = tokens.next() {
            if token.eq_ignore_ascii_case(CODE_LOOKUP_MARKER) {
                return tokens.next().map(|code| code.to_string());
            }
        }
        None
    }

    /// First configured provider found in the message, as configured
    /// (original casing), or None.
    pub fn extract_insurance_provider(&self, message: &str) -> Option<String> {
        let normalized = message.to_lowercase();
        self.insurance_providers
            .iter()
            .find(|provider| normalized.contains(&provider.to_lowercase()))
            .cloned()
    }

    fn provider_mentioned(&self, normalized: &str) -> bool {
        self.insurance_providers
            .iter()
            .any(|provider| normalized.contains(&provider.to_lowercase()))
    }
}
