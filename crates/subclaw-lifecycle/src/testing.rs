//! In-memory collaborators for lifecycle tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use subclaw_core::error::{Result, SubClawError};
use subclaw_core::phone::normalize_phone;
use subclaw_core::traits::{ChatTransport, Clock, TabularStore};

use crate::engine::{Lifecycle, LifecycleSettings};
use crate::records::*;

pub const OPERATOR: &str = "18494736782@c.us";

/// A full 16-cell sheet row.
pub fn client_row(
    id: &str,
    name: &str,
    phone: &str,
    expiration: &str,
    purchase: f64,
    sale: f64,
) -> Vec<String> {
    let mut row = vec![String::new(); COLUMN_COUNT];
    row[COL_ID] = id.into();
    row[COL_NAME] = name.into();
    row[COL_PHONE] = phone.into();
    row[COL_SERVICE] = "Netflix".into();
    row[COL_EMAIL] = format!("{}@mail.com", id.to_lowercase());
    row[COL_PASSWORD] = "secret".into();
    row[COL_PROFILE] = "Perfil 1".into();
    row[COL_EXPIRATION] = expiration.into();
    if purchase > 0.0 {
        row[COL_PURCHASE_PRICE] = purchase.to_string();
    }
    if sale > 0.0 {
        row[COL_SALE_PRICE] = sale.to_string();
    }
    row
}

/// Grid-backed store. Row 0 of the grid is sheet row `first_row`.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<(String, String)>>,
    reads: Mutex<usize>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub const FIRST_ROW: u32 = 2;

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn set_rows(&self, rows: Vec<Vec<String>>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// `(cell, value)` pairs in write order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        *self.reads.lock().unwrap()
    }

    pub fn cell(&self, col: usize, sheet_row: u32) -> String {
        let rows = self.rows.lock().unwrap();
        rows.get((sheet_row - Self::FIRST_ROW) as usize)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }
}

fn split_cell(cell: &str) -> Option<(usize, u32)> {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let number: u32 = cell[letters.len()..].parse().ok()?;
    if letters.is_empty() {
        return None;
    }
    let col = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize)
        - 1;
    Some((col, number))
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_range(&self, _sheet: &str, _range: &str) -> Result<Vec<Vec<String>>> {
        *self.reads.lock().unwrap() += 1;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SubClawError::StoreRead("sheet unavailable".into()));
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn write_cell(&self, _sheet: &str, cell: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SubClawError::StoreWrite("permission denied".into()));
        }
        let (col, sheet_row) =
            split_cell(cell).ok_or_else(|| SubClawError::StoreWrite(format!("bad cell {cell}")))?;
        let idx = (sheet_row - Self::FIRST_ROW) as usize;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(idx)
            .ok_or_else(|| SubClawError::StoreWrite(format!("row {sheet_row} out of range")))?;
        if row.len() <= col {
            row.resize(col + 1, String::new());
        }
        row[col] = value.to_string();
        self.writes.lock().unwrap().push((cell.to_string(), value.to_string()));
        Ok(())
    }
}

/// Transport that records every send. Recipients in `failing` error out.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
    latency: Mutex<Duration>,
}

impl RecordingTransport {
    /// Every send waits this long before it is recorded.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn fail_for(&self, phone: &str) {
        self.failing.lock().unwrap().insert(normalize_phone(phone));
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(t, _)| t == to)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<()> {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.sent.lock().unwrap().push((to.to_string(), text.to_string()));
        if self.failing.lock().unwrap().contains(to) {
            return Err(SubClawError::send(to, "recipient unreachable"));
        }
        Ok(())
    }
}

/// Settable clock.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Noon in Santo Domingo (UTC-4) on the given day.
pub fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 16, 0, 0).unwrap()
}

pub struct Harness {
    pub lifecycle: Arc<Lifecycle>,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<FixedClock>,
}

pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        operator_id: OPERATOR.into(),
        timezone: chrono_tz::America::Santo_Domingo,
        sheet_name: "Clientes".into(),
        data_range: "A2:P".into(),
        first_data_row: MemoryStore::FIRST_ROW,
        broadcast_delay: Duration::ZERO,
        delivery_delay: Duration::ZERO,
        reply_cooldown: chrono::Duration::hours(24),
        default_renewal_days: 30,
    }
}

/// Lifecycle over in-memory collaborators, clock at local noon 2024-01-15.
/// The cache starts empty; call `refresh` to load `rows`.
pub fn harness(rows: Vec<Vec<String>>) -> Harness {
    let store = Arc::new(MemoryStore::with_rows(rows));
    let transport = Arc::new(RecordingTransport::default());
    let clock = Arc::new(FixedClock::at(local_noon(2024, 1, 15)));
    let lifecycle = Arc::new(Lifecycle::new(
        settings(),
        store.clone(),
        transport.clone(),
        clock.clone(),
    ));
    Harness {
        lifecycle,
        store,
        transport,
        clock,
    }
}

/// Harness with the cache already loaded.
pub async fn loaded(rows: Vec<Vec<String>>) -> Harness {
    let h = harness(rows);
    h.lifecycle.refresh().await.unwrap();
    h
}
