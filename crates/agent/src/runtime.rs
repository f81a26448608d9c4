use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use tracing::{error, info};

use optibot_core::config::{BusinessConfig, ContextConfig};
use optibot_core::{HandlerError, Intent, ProductRecord};
use optibot_sheets::CatalogService;

use crate::context::{ContextStore, ContextUpdate};
use crate::recognizer::IntentRecognizer;
use crate::replies;

pub const SLOT_PRODUCT_CODE: &str = "product_code";
pub const SLOT_INSURANCE_PROVIDER: &str = "insurance_provider";

/// Orchestrates one dialogue turn: classify, dispatch, record, reply.
/// `process_turn` never fails; every internal error becomes the fixed
/// fallback reply and the turn is still recorded.
pub struct DialogueRuntime {
    recognizer: IntentRecognizer,
    store: ContextStore,
    catalog: CatalogService,
    business: BusinessConfig,
}

impl DialogueRuntime {
    pub fn new(catalog: CatalogService, business: BusinessConfig, context: ContextConfig) -> Self {
        Self {
            recognizer: IntentRecognizer::new(business.insurance_providers.clone()),
            store: ContextStore::with_limits(context.history_limit, context.ttl_hours),
            catalog,
            business,
        }
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Each turn is processed independently of the previous one. The prior
    /// turn's `current_intent` and slots are fetched and kept up to date,
    /// which is the hook for a future continuation handler (e.g. a bare
    /// provider name right after an insurance question); none is wired in
    /// today.
    pub async fn process_turn(&self, user_id: &str, message: &str) -> String {
        let _context = self.store.get(user_id).await;

        let intent = self.recognizer.classify(message);
        info!(
            event_name = "dialogue.turn.classified",
            user_id = %user_id,
            intent = intent.as_str(),
            "message classified"
        );

        let mut slots = HashMap::new();
        let reply = match self.dispatch(intent, message, &mut slots).await {
            Ok(reply) => reply,
            Err(handler_error) => {
                error!(
                    event_name = "dialogue.turn.fallback",
                    user_id = %user_id,
                    intent = intent.as_str(),
                    error = %handler_error,
                    "handler failed; answering with the fallback reply"
                );
                handler_error.user_message().to_string()
            }
        };

        self.store.append_history(user_id, message, &reply).await;
        self.store
            .update(
                user_id,
                ContextUpdate {
                    current_intent: Some(intent),
                    slots: (!slots.is_empty()).then_some(slots),
                },
            )
            .await;

        reply
    }

    async fn dispatch(
        &self,
        intent: Intent,
        message: &str,
        slots: &mut HashMap<String, String>,
    ) -> Result<String, HandlerError> {
        match intent {
            Intent::Greeting => Ok(replies::greeting()),
            Intent::Farewell => Ok(replies::farewell()),
            Intent::ProductInquiry => Ok(self.handle_product_inquiry(message).await),
            Intent::PriceInquiry => Ok(self.handle_price_inquiry().await),
            Intent::StockInquiry => Ok(self.handle_stock_inquiry(message).await),
            Intent::StockByCode => Ok(self.handle_stock_by_code(message, slots).await),
            Intent::LocationInquiry => Ok(replies::location(&self.business)),
            Intent::HoursInquiry => Ok(replies::hours(&self.business)),
            Intent::InsuranceInquiry => Ok(self.handle_insurance(message, slots)),
            Intent::ContactLensInquiry => Ok(replies::contact_lenses(&self.business)),
            Intent::LiquidsInquiry => Ok(replies::liquids()),
            Intent::BrandInquiry => self.handle_brand_inquiry().await,
            Intent::Emergency => Ok(replies::emergency(&self.business)),
            Intent::Unknown => Ok(replies::unknown()),
        }
    }

    async fn handle_product_inquiry(&self, message: &str) -> String {
        let hits = self.catalog.search(message).await;
        if hits.is_empty() {
            return replies::product_not_found();
        }

        let limit = self.business.max_search_results;
        let shown = hits.len().min(limit);
        let mut lines = vec!["Encontré estas opciones:".to_string()];
        for record in hits.iter().take(limit) {
            lines.push(format!("• {}", describe(record)));
        }
        if hits.len() > shown {
            lines.push(format!(
                "...y {} más. Afiná la búsqueda con marca o modelo.",
                hits.len() - shown
            ));
        }
        lines.join("\n")
    }

    /// One line per category with its in-stock price range. A category with
    /// no priced in-stock items, or whose fetch failed, reads "consultar":
    /// the aggregation never collapses because one sheet is down.
    async fn handle_price_inquiry(&self) -> String {
        let mut lines = vec!["Rangos de precios por categoría:".to_string()];
        for category in &self.business.categories {
            let range = match self.catalog.try_fetch_category(category).await {
                Ok(records) => price_range(&records),
                Err(_) => None,
            };
            let line = match range {
                Some((min, max)) if min == max => {
                    format!("• {category}: {}", replies::format_ars(min))
                }
                Some((min, max)) => format!(
                    "• {category}: de {} a {}",
                    replies::format_ars(min),
                    replies::format_ars(max)
                ),
                None => format!("• {category}: consultar"),
            };
            lines.push(line);
        }
        lines.join("\n")
    }

    async fn handle_stock_inquiry(&self, message: &str) -> String {
        let hits = self.catalog.search(message).await;
        if hits.is_empty() {
            return replies::product_not_found();
        }

        let (available, unavailable): (Vec<_>, Vec<_>) =
            hits.into_iter().partition(ProductRecord::in_stock);

        if available.is_empty() {
            return format!(
                "Por el momento no tenemos stock de eso ({} productos relacionados sin stock). Consultanos en unos días.",
                unavailable.len()
            );
        }

        let mut lines = vec!["Tenemos en stock:".to_string()];
        for record in available.iter().take(self.business.max_stock_results) {
            lines.push(format!("• {} — {} unidades", describe(record), record.stock));
        }
        if !unavailable.is_empty() {
            lines.push(format!("Además hay {} productos relacionados sin stock.", unavailable.len()));
        }
        lines.join("\n")
    }

    async fn handle_stock_by_code(
        &self,
        message: &str,
        slots: &mut HashMap<String, String>,
    ) -> String {
        let Some(code) = self.recognizer.extract_code(message) else {
            return replies::code_clarification();
        };
        slots.insert(SLOT_PRODUCT_CODE.to_string(), code.clone());

        match self.catalog.find_by_code(&code).await {
            Some(record) if record.in_stock() => format!(
                "{} (código {}): {} unidades en stock. Precio: {}.",
                record.display_name(),
                record.code,
                record.stock,
                price_or_consult(record.price)
            ),
            Some(record) => format!(
                "{} (código {}) está sin stock por el momento. Precio de lista: {}.",
                record.display_name(),
                record.code,
                price_or_consult(record.price)
            ),
            None => format!("No encontré ningún producto con el código {code}. Revisá el código o mandame una descripción."),
        }
    }

    fn handle_insurance(&self, message: &str, slots: &mut HashMap<String, String>) -> String {
        match self.recognizer.extract_insurance_provider(message) {
            Some(provider) => {
                slots.insert(SLOT_INSURANCE_PROVIDER.to_string(), provider.clone());
                replies::insurance_accepted(&provider)
            }
            None => replies::insurance_list(&self.business),
        }
    }

    /// Brand listing needs live data to say anything useful, so data-source
    /// failures surface as handler errors and become the fallback reply.
    async fn handle_brand_inquiry(&self) -> Result<String, HandlerError> {
        let mut brands = BTreeSet::new();
        for category in &self.business.categories {
            let records = self
                .catalog
                .try_fetch_category(category)
                .await
                .map_err(|sheets_error| HandlerError::Catalog(sheets_error.to_string()))?;
            brands.extend(
                records
                    .into_iter()
                    .map(|record| record.brand)
                    .filter(|brand| !brand.is_empty()),
            );
        }

        if brands.is_empty() {
            return Ok("Todavía no tengo marcas cargadas para mostrarte. Consultanos por teléfono.".to_string());
        }

        Ok(format!(
            "Trabajamos con estas marcas: {}.",
            brands.into_iter().collect::<Vec<_>>().join(", ")
        ))
    }
}

fn describe(record: &ProductRecord) -> String {
    let mut text = record.display_name();
    if !record.color.is_empty() {
        text.push_str(&format!(" {}", record.color));
    }
    if record.has_price() {
        text.push_str(&format!(" — {}", replies::format_ars(record.price)));
    }
    text
}

fn price_or_consult(price: Decimal) -> String {
    if price > Decimal::ZERO {
        replies::format_ars(price)
    } else {
        "consultar".to_string()
    }
}

/// `(min, max)` over in-stock records with a positive price. Explicitly
/// None for an empty set: min over nothing is undefined, not a crash.
fn price_range(records: &[ProductRecord]) -> Option<(Decimal, Decimal)> {
    let priced: Vec<Decimal> = records
        .iter()
        .filter(|record| record.in_stock() && record.has_price())
        .map(|record| record.price)
        .collect();

    let min = priced.iter().min().copied()?;
    let max = priced.iter().max().copied()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;

    use optibot_core::config::AppConfig;
    use optibot_core::Intent;
    use optibot_sheets::client::{RowFetcher, RowGrid, SheetsError};
    use optibot_sheets::{CatalogService, SchemaRegistry};

    use crate::replies::{FAREWELL_VARIANTS, GREETING_VARIANTS};

    use super::DialogueRuntime;

    struct StubFetcher {
        sheets: HashMap<String, RowGrid>,
        failing: Vec<String>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self { sheets: HashMap::new(), failing: Vec::new() }
        }

        fn with_sheet(mut self, title: &str, rows: &[&[&str]]) -> Self {
            let grid = rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            self.sheets.insert(title.to_string(), grid);
            self
        }

        fn with_failure(mut self, title: &str) -> Self {
            self.failing.push(title.to_string());
            self
        }
    }

    #[async_trait]
    impl RowFetcher for StubFetcher {
        async fn fetch_rows(&self, sheet_title: &str) -> Result<RowGrid, SheetsError> {
            if self.failing.iter().any(|title| title == sheet_title) {
                return Err(SheetsError::Transport("connection reset".to_string()));
            }
            self.sheets
                .get(sheet_title)
                .cloned()
                .ok_or_else(|| SheetsError::NotFound { sheet: sheet_title.to_string() })
        }
    }

    const HEADERS: &[&str] =
        &["Código", "Marca", "Modelo", "Color", "Cantidad", "Precio", "Descripción"];

    fn runtime_with(fetcher: StubFetcher, categories: &[&str]) -> DialogueRuntime {
        let mut config = AppConfig::default();
        config.business.categories =
            categories.iter().map(|category| category.to_string()).collect();

        let catalog = CatalogService::new(
            Arc::new(fetcher),
            SchemaRegistry::builtin(),
            config.business.categories.clone(),
        );
        DialogueRuntime::new(catalog, config.business, config.context)
    }

    fn stocked_fetcher() -> StubFetcher {
        StubFetcher::new().with_sheet(
            "Armazones",
            &[
                HEADERS,
                &["AR-01", "Vulk", "Nitro", "Negro", "4 unidades", "$ 1.250,50", "Acetato"],
                &["AR-02", "Vulk", "Neo", "Azul", "0", "$ 2.000", "Metal"],
                &["AR-03", "Sarkany", "Luna", "Rojo", "2", "$ 900", ""],
            ],
        )
    }

    #[tokio::test]
    async fn greeting_turn_creates_context_and_records_intent() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "hola").await;

        assert!(GREETING_VARIANTS.contains(&reply.as_str()));
        let context = runtime.store().get("u1").await;
        assert_eq!(context.current_intent, Some(Intent::Greeting));
        assert_eq!(context.history.len(), 1);
        assert_eq!(context.history[0].bot_response, reply);
    }

    #[tokio::test]
    async fn farewell_reply_stays_in_the_variant_set() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);
        let reply = runtime.process_turn("u1", "chau!").await;
        assert!(FAREWELL_VARIANTS.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn unknown_code_reports_not_found_without_failing() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "#stock ZZ-99").await;

        assert!(reply.contains("ZZ-99"));
        assert!(reply.contains("No encontré"));
        let context = runtime.store().get("u1").await;
        assert_eq!(context.current_intent, Some(Intent::StockByCode));
        assert_eq!(context.slots.get("product_code").map(String::as_str), Some("ZZ-99"));
    }

    #[tokio::test]
    async fn known_code_reports_stock_and_price() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "#stock ar-01").await;

        assert!(reply.contains("Vulk Nitro"));
        assert!(reply.contains("4 unidades"));
        assert!(reply.contains("$1.250,50"));
    }

    #[tokio::test]
    async fn missing_code_asks_for_clarification() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);
        let reply = runtime.process_turn("u1", "#stock").await;
        assert!(reply.contains("#stock CÓDIGO"));
    }

    #[tokio::test]
    async fn emergency_with_product_words_gets_the_safety_reply() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "me duele el ojo, busco anteojos").await;

        assert!(reply.contains("profesional"));
        let context = runtime.store().get("u1").await;
        assert_eq!(context.current_intent, Some(Intent::Emergency));
    }

    #[tokio::test]
    async fn product_search_lists_limited_results() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "busco un vulk").await;

        assert!(reply.contains("Vulk Nitro"));
        assert!(reply.contains("Vulk Neo"));
        assert!(!reply.contains("Sarkany"));
    }

    #[tokio::test]
    async fn product_search_without_hits_asks_to_be_more_specific() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);
        let reply = runtime.process_turn("u1", "busco algo inexistente").await;
        assert!(reply.contains("más específico"));
    }

    #[tokio::test]
    async fn stock_inquiry_partitions_in_and_out_of_stock() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "tienen vulk disponibles?").await;

        assert!(reply.contains("Vulk Nitro"));
        assert!(reply.contains("1 productos relacionados sin stock")
            || reply.contains("1 producto"));
    }

    #[tokio::test]
    async fn price_inquiry_survives_a_failing_category() {
        let fetcher = stocked_fetcher().with_failure("Anteojos de Sol");
        let runtime = runtime_with(fetcher, &["Armazones", "Anteojos de Sol"]);

        let reply = runtime.process_turn("u1", "qué precios manejan?").await;

        assert!(reply.contains("Armazones: de $900 a $1.250,50"));
        assert!(reply.contains("Anteojos de Sol: consultar"));
    }

    #[tokio::test]
    async fn brand_inquiry_falls_back_when_the_catalog_is_down() {
        let fetcher = StubFetcher::new().with_failure("Armazones");
        let runtime = runtime_with(fetcher, &["Armazones"]);

        let reply = runtime.process_turn("u1", "qué marcas tienen?").await;

        assert!(reply.contains("inconveniente"));
        // The failed turn is still recorded with the fallback response.
        let context = runtime.store().get("u1").await;
        assert_eq!(context.history.len(), 1);
        assert_eq!(context.history[0].bot_response, reply);
    }

    #[tokio::test]
    async fn insurance_question_with_provider_records_the_slot() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        let reply = runtime.process_turn("u1", "atienden OSDE?").await;

        assert!(reply.contains("OSDE"));
        let context = runtime.store().get("u1").await;
        assert_eq!(context.slots.get("insurance_provider").map(String::as_str), Some("OSDE"));
    }

    #[tokio::test]
    async fn fifty_one_turns_keep_the_last_fifty() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        for turn in 1..=51 {
            runtime.process_turn("u1", &format!("hola {turn}")).await;
        }

        let context = runtime.store().get("u1").await;
        assert_eq!(context.history.len(), 50);
        assert_eq!(context.history[0].user_message, "hola 2");
        assert_eq!(context.history[49].user_message, "hola 51");
    }

    #[tokio::test]
    async fn turns_for_different_users_keep_separate_contexts() {
        let runtime = runtime_with(stocked_fetcher(), &["Armazones"]);

        runtime.process_turn("u1", "hola").await;
        runtime.process_turn("u2", "#stock AR-01").await;

        assert_eq!(runtime.store().get("u1").await.current_intent, Some(Intent::Greeting));
        assert_eq!(runtime.store().get("u2").await.current_intent, Some(Intent::StockByCode));
    }
}
