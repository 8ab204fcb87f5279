//! Seams to the external collaborators.
//!
//! The lifecycle engine only ever talks to the outside world through these
//! traits, so tests swap in memory-backed versions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Outbound side of the chat transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &str;

    /// Send a text message to a contact identifier (`<digits>@c.us`).
    async fn send_message(&self, to: &str, text: &str) -> Result<()>;
}

/// A spreadsheet-like store addressed by sheet name + A1 ranges.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read all rows of a range. Cells are rendered as strings; short rows
    /// are returned short (trailing blanks omitted).
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Write one value into a single cell (e.g. `J7`).
    async fn write_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()>;
}

/// Source of "now". Injected so date arithmetic is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
