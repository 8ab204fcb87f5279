//! `spreadsheets.values.get` / `spreadsheets.values.update` over reqwest.

use std::borrow::Cow;

use async_trait::async_trait;
use serde::Deserialize;
use subclaw_core::config::StoreConfig;
use subclaw_core::error::{Result, SubClawError};
use subclaw_core::traits::TabularStore;

use crate::auth::TokenProvider;

/// Response body of `values.get`.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Google Sheets backed store.
pub struct SheetsStore {
    spreadsheet_id: String,
    auth: TokenProvider,
    api_base: String,
    client: reqwest::Client,
}

impl SheetsStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            spreadsheet_id: config.spreadsheet_id.clone(),
            auth: TokenProvider::from_config(config),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Whether access tokens are refreshed from OAuth credentials.
    pub fn refreshes_token(&self) -> bool {
        self.auth.can_refresh()
    }

    /// `{base}/spreadsheets/{id}/values/{sheet!range}` with the A1 range
    /// percent-encoded as a single path segment.
    fn values_url(&self, sheet: &str, range: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| SubClawError::Config(format!("Invalid Sheets api_base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SubClawError::Config("Sheets api_base cannot be a base URL".into()))?
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&a1(sheet, range));
        Ok(url)
    }

    fn check_configured(&self) -> Result<()> {
        if self.spreadsheet_id.is_empty() {
            return Err(SubClawError::Config("store.spreadsheet_id not configured".into()));
        }
        Ok(())
    }

    /// A 401 means the token died before its recorded expiry.
    async fn note_rejected_token(&self, status: reqwest::StatusCode) {
        if status == reqwest::StatusCode::UNAUTHORIZED && self.auth.can_refresh() {
            tracing::warn!("⚠️ Sheets rejected the access token, refreshing on next call");
            self.auth.invalidate().await;
        }
    }
}

/// Sheet names other than plain identifiers must be single-quoted in A1
/// notation, with embedded quotes doubled.
fn quote_sheet_name(sheet: &str) -> Cow<'_, str> {
    let bare = !sheet.is_empty()
        && !sheet.starts_with(|c: char| c.is_ascii_digit())
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        Cow::Borrowed(sheet)
    } else {
        Cow::Owned(format!("'{}'", sheet.replace('\'', "''")))
    }
}

fn a1(sheet: &str, range: &str) -> String {
    format!("{}!{range}", quote_sheet_name(sheet))
}

/// Render a cell the way the sheet shows it. Formatted values come back as
/// strings already; numbers and bools only appear with other render options.
fn cell_to_string(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_value_range(body: &str) -> Result<Vec<Vec<String>>> {
    let range: ValueRange = serde_json::from_str(body)?;
    Ok(range
        .values
        .iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        self.check_configured()
            .map_err(|e| SubClawError::StoreRead(e.to_string()))?;
        let url = self
            .values_url(sheet, range)
            .map_err(|e| SubClawError::StoreRead(e.to_string()))?;
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| SubClawError::StoreRead(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SubClawError::StoreRead(format!("Sheets request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SubClawError::StoreRead(format!("Sheets body read failed: {e}")))?;
        if !status.is_success() {
            self.note_rejected_token(status).await;
            return Err(SubClawError::StoreRead(format!("Sheets API error {status}: {text}")));
        }

        let rows = parse_value_range(&text)
            .map_err(|e| SubClawError::StoreRead(format!("Invalid Sheets response: {e}")))?;
        tracing::debug!("📄 Read {} rows from {}", rows.len(), a1(sheet, range));
        Ok(rows)
    }

    async fn write_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()> {
        self.check_configured()
            .map_err(|e| SubClawError::StoreWrite(e.to_string()))?;
        let url = self
            .values_url(sheet, cell)
            .map_err(|e| SubClawError::StoreWrite(e.to_string()))?;
        let range = a1(sheet, cell);
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| SubClawError::StoreWrite(e.to_string()))?;

        let response = self
            .client
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(token)
            .json(&serde_json::json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [[value]],
            }))
            .send()
            .await
            .map_err(|e| SubClawError::StoreWrite(format!("Sheets request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            self.note_rejected_token(status).await;
            return Err(SubClawError::StoreWrite(format!("Sheets API error {status}: {text}")));
        }

        tracing::debug!("✏️ Wrote '{}' to {}", value, range);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SheetsStore {
        SheetsStore::new(&StoreConfig {
            spreadsheet_id: "abc123".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = store().values_url("Clientes", "A2:P").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Clientes!A2:P"
        );

        let url = store().values_url("Mis Clientes", "J7").unwrap();
        assert!(url.as_str().ends_with("/values/'Mis%20Clientes'!J7"));
    }

    #[test]
    fn test_a1_quotes_non_identifier_sheet_names() {
        assert_eq!(a1("Clientes", "A2:P"), "Clientes!A2:P");
        assert_eq!(a1("Hoja_1", "J3"), "Hoja_1!J3");
        assert_eq!(a1("Mis Clientes", "J7"), "'Mis Clientes'!J7");
        assert_eq!(a1("Clientes-2024", "J7"), "'Clientes-2024'!J7");
        assert_eq!(a1("Ana's", "J7"), "'Ana''s'!J7");
        assert_eq!(a1("2024", "A2:P"), "'2024'!A2:P");
    }

    #[test]
    fn test_parse_value_range() {
        let body = r#"{
            "range": "Clientes!A2:P4",
            "majorDimension": "ROWS",
            "values": [
                ["C1", "Ana", "8095551234"],
                ["C2", "Luis", 8095550000, null, true]
            ]
        }"#;
        let rows = parse_value_range(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["C1", "Ana", "8095551234"]);
        assert_eq!(rows[1][2], "8095550000");
        assert_eq!(rows[1][3], "");
        assert_eq!(rows[1][4], "true");
    }

    #[test]
    fn test_parse_empty_sheet() {
        let rows = parse_value_range(r#"{"range": "Clientes!A2:P"}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_refreshes_token_only_with_credentials() {
        assert!(!store().refreshes_token());
        let refreshing = SheetsStore::new(&StoreConfig {
            spreadsheet_id: "abc123".into(),
            client_id: "client-1".into(),
            refresh_token: "1//refresh".into(),
            ..Default::default()
        });
        assert!(refreshing.refreshes_token());
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let store = store();
        let err = store.read_range("Clientes", "A2:P").await.unwrap_err();
        assert!(matches!(err, SubClawError::StoreRead(_)));
        assert!(err.to_string().contains("access token"));
    }

    #[tokio::test]
    async fn test_unconfigured_store_fails_read() {
        let store = SheetsStore::new(&StoreConfig::default());
        let err = store.read_range("Clientes", "A2:P").await.unwrap_err();
        assert!(matches!(err, SubClawError::StoreRead(_)));
        let err = store.write_cell("Clientes", "J2", "01/01/2025").await.unwrap_err();
        assert!(matches!(err, SubClawError::StoreWrite(_)));
    }
}
