//! Renewal and manual account delivery.

use chrono::{Days, NaiveDate};
use subclaw_core::error::{Result, SubClawError};
use subclaw_core::phone::normalize_phone;
use subclaw_core::types::ClientRecord;

use crate::engine::Lifecycle;
use crate::messages;
use crate::records::{COL_EXPIRATION, column_letter, format_sheet_date};

/// Renewal length from an operator argument. Missing, non-numeric or zero
/// falls back to `default`.
pub fn parse_renewal_days(arg: Option<&str>, default: u32) -> u32 {
    match arg.map(str::trim).and_then(|a| a.parse::<u32>().ok()) {
        Some(days) if days > 0 => days,
        _ => default,
    }
}

impl Lifecycle {
    /// Extend a client's expiration by `days`, persist it, reload the cache
    /// and tell the client. Returns the new expiration date.
    ///
    /// The gate is held from lookup through the reload; the client
    /// notification goes out after release.
    pub async fn renew(&self, id: &str, days: u32) -> Result<NaiveDate> {
        let guard = self.gate().acquire("renewal").await;

        let snapshot = self.cache().snapshot();
        let client = snapshot
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| SubClawError::NotFound(id.to_string()))?;
        let row = snapshot
            .row_of(&client.id)
            .ok_or_else(|| SubClawError::NotFound(id.to_string()))?;
        drop(snapshot);

        let base = client.expiration_date.unwrap_or_else(|| self.today());
        let new_date = base
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| SubClawError::StoreWrite(format!("date overflow renewing {id}")))?;

        let cell = format!("{}{}", column_letter(COL_EXPIRATION), row);
        if let Err(e) = self
            .store
            .write_cell(&self.settings().sheet_name, &cell, &format_sheet_date(new_date))
            .await
        {
            tracing::error!("❌ Renewal write for {} at {} failed: {}", client.id, cell, e);
            return Err(e);
        }
        tracing::info!("✅ Renewed {} by {} days → {}", client.id, days, new_date);

        if let Err(e) = self.reload_locked(&guard).await {
            tracing::warn!("⚠️ Cache reload after renewing {} failed: {}", client.id, e);
        }
        drop(guard);

        if client.has_phone() {
            let to = normalize_phone(&client.phone);
            let _ = self
                .send(&to, &messages::renewal_notice(&client, days, new_date))
                .await;
        }
        Ok(new_date)
    }

    /// Send a client their current account details. Does not renew.
    pub async fn deliver_account(&self, id: &str) -> Result<ClientRecord> {
        let client = self
            .cache()
            .find_by_id(id)
            .ok_or_else(|| SubClawError::NotFound(id.to_string()))?;
        if !client.has_phone() {
            return Err(SubClawError::send(&client.id, "client has no phone"));
        }
        let to = normalize_phone(&client.phone);
        self.send(&to, &messages::account_delivery(&client)).await?;
        tracing::info!("📦 Account {} delivered to {}", client.id, to);
        Ok(client)
    }
}
