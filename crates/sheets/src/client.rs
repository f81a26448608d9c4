use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use optibot_core::config::SheetsConfig;

/// Raw cell grid for one sheet, header row included. Cells are kept as text;
/// all shaping happens in the catalog normalizer.
pub type RowGrid = Vec<Vec<String>>;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("sheets request failed: {0}")]
    Transport(String),
    #[error("sheets credentials were rejected (status {status})")]
    Auth { status: u16 },
    #[error("sheet `{sheet}` was not found in the spreadsheet")]
    NotFound { sheet: String },
    #[error("sheets API returned unexpected status {status}")]
    Status { status: u16 },
    #[error("could not decode sheets response: {0}")]
    Decode(String),
}

/// Port for the tabular data source. The production implementation talks to
/// the Google Sheets `values` API; tests substitute an in-memory grid.
#[async_trait]
pub trait RowFetcher: Send + Sync {
    async fn fetch_rows(&self, sheet_title: &str) -> Result<RowGrid, SheetsError>;
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    api_key: SecretString,
}

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| SheetsError::Transport(error.to_string()))?;

        let base_url = Url::parse(SHEETS_API_BASE)
            .map_err(|error| SheetsError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn values_url(&self, sheet_title: &str) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::Transport("sheets base url cannot be a base".to_string()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(sheet_title);
        Ok(url)
    }
}

#[async_trait]
impl RowFetcher for GoogleSheetsClient {
    async fn fetch_rows(&self, sheet_title: &str) -> Result<RowGrid, SheetsError> {
        let url = self.values_url(sheet_title)?;
        let response = self
            .http
            .get(url)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(|error| SheetsError::Transport(error.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SheetsError::Auth { status: response.status().as_u16() });
            }
            // The values API answers 400 for a range naming a missing sheet.
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(SheetsError::NotFound { sheet: sheet_title.to_string() });
            }
            status => return Err(SheetsError::Status { status: status.as_u16() }),
        }

        let body: ValueRange = response
            .json()
            .await
            .map_err(|error| SheetsError::Decode(error.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
