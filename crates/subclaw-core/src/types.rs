//! Shared data types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One subscription row of the backing spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientRecord {
    /// Opaque id, compared case-insensitively.
    pub id: String,
    pub name: String,
    /// Free-form phone as typed in the sheet.
    pub phone: String,
    /// Service label (e.g. "Netflix").
    pub service: String,
    pub email: String,
    pub password: String,
    /// Profile label inside the shared account.
    pub profile: String,
    pub pin: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    /// Cost paid by the reseller, DOP.
    pub purchase_price_dop: f64,
    /// Price charged to the client, DOP.
    pub sale_price_dop: f64,
}

impl ClientRecord {
    /// Whether the record has a usable phone number.
    pub fn has_phone(&self) -> bool {
        self.phone.chars().any(|c| c.is_ascii_digit())
    }

    /// Case-insensitive id match, folded the same way as [`id_key`].
    pub fn id_matches(&self, id: &str) -> bool {
        !self.id.is_empty() && id_key(&self.id) == id_key(id)
    }
}

/// Lookup key for a client id: trimmed and Unicode-lowercased.
pub fn id_key(id: &str) -> String {
    id.trim().to_lowercase()
}

/// A text message received from the chat transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Normalized contact identifier of the sender.
    pub from: String,
    pub body: String,
}

impl IncomingMessage {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
        }
    }
}
