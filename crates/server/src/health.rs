use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use optibot_sheets::CatalogService;

#[derive(Clone)]
pub struct HealthState {
    catalog: CatalogService,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(catalog: CatalogService) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { catalog })
}

/// Readiness is tied to the data source: the probe fetches the first
/// configured sheet. A failure degrades the status without taking the
/// process down, mirroring how the chat path degrades per category.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.catalog).await;
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "optibot-server runtime initialized".to_string(),
        },
        catalog,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn catalog_check(catalog: &CatalogService) -> HealthCheck {
    let Some(category) = catalog.categories().first() else {
        return HealthCheck {
            status: "degraded",
            detail: "no catalog categories configured".to_string(),
        };
    };

    match catalog.try_fetch_category(category).await {
        Ok(records) => HealthCheck {
            status: "ready",
            detail: format!("sheet `{category}` answered with {} records", records.len()),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("sheet fetch failed: {error}") }
        }
    }
}
