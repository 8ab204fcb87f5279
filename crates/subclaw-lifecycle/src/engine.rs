//! The shared lifecycle engine: cache, gate and collaborators in one place.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use subclaw_core::config::SubClawConfig;
use subclaw_core::error::Result;
use subclaw_core::phone::normalize_phone;
use subclaw_core::traits::{ChatTransport, Clock, TabularStore};

use crate::cache::{CacheSnapshot, ClientCache};
use crate::gate::{BusyGate, BusyGuard};
use crate::messages;

/// Runtime knobs derived from [`SubClawConfig`].
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Normalized operator contact identifier.
    pub operator_id: String,
    pub timezone: Tz,
    pub sheet_name: String,
    pub data_range: String,
    pub first_data_row: u32,
    pub broadcast_delay: Duration,
    pub delivery_delay: Duration,
    pub reply_cooldown: chrono::Duration,
    pub default_renewal_days: u32,
}

impl LifecycleSettings {
    pub fn from_config(config: &SubClawConfig) -> Result<Self> {
        Ok(Self {
            operator_id: normalize_phone(&config.operator_phone),
            timezone: config.tz()?,
            sheet_name: config.store.sheet_name.clone(),
            data_range: config.store.data_range.clone(),
            first_data_row: config.store.first_data_row,
            broadcast_delay: Duration::from_millis(config.messaging.broadcast_delay_ms),
            delivery_delay: Duration::from_millis(config.messaging.delivery_delay_ms),
            reply_cooldown: chrono::Duration::hours(config.messaging.reply_cooldown_hours),
            default_renewal_days: config.messaging.default_renewal_days,
        })
    }
}

/// Everything the workflows share. Reminders, renewal, broadcast and
/// earnings are implemented as further `impl Lifecycle` blocks in their
/// own modules.
pub struct Lifecycle {
    cache: ClientCache,
    gate: BusyGate,
    pub(crate) store: Arc<dyn TabularStore>,
    transport: Arc<dyn ChatTransport>,
    clock: Arc<dyn Clock>,
    settings: LifecycleSettings,
}

impl Lifecycle {
    pub fn new(
        settings: LifecycleSettings,
        store: Arc<dyn TabularStore>,
        transport: Arc<dyn ChatTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: ClientCache::new(),
            gate: BusyGate::new(),
            store,
            transport,
            clock,
            settings,
        }
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    pub fn gate(&self) -> &BusyGate {
        &self.gate
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub fn operator_id(&self) -> &str {
        &self.settings.operator_id
    }

    /// Current calendar date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.settings.timezone).date_naive()
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Send one message. Failures are logged and returned.
    pub async fn send(&self, to: &str, text: &str) -> Result<()> {
        let result = self.transport.send_message(to, text).await;
        if let Err(e) = &result {
            tracing::warn!("⚠️ {} send to {} failed: {}", self.transport.name(), to, e);
        }
        result
    }

    /// Send to the operator. Returns whether delivery succeeded.
    pub async fn notify_operator(&self, text: &str) -> bool {
        self.send(&self.settings.operator_id, text).await.is_ok()
    }

    /// Reload the cache from the store, holding the gate for the duration.
    pub async fn refresh(&self) -> Result<usize> {
        let guard = self.gate.acquire("refresh").await;
        self.reload_locked(&guard).await
    }

    /// Reload while the caller already holds the gate.
    ///
    /// On a read failure the current snapshot stays in place and the operator
    /// gets a critical alert.
    pub(crate) async fn reload_locked(&self, guard: &BusyGuard) -> Result<usize> {
        tracing::debug!("🔄 Refreshing client cache ({})", guard.operation());
        let rows = match self
            .store
            .read_range(&self.settings.sheet_name, &self.settings.data_range)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("❌ Cache refresh failed, keeping previous snapshot: {}", e);
                self.notify_operator(messages::STORE_READ_ALERT).await;
                return Err(e);
            }
        };

        let snapshot = CacheSnapshot::from_rows(&rows, self.settings.first_data_row, self.now());
        let count = snapshot.len();
        self.cache.replace(snapshot);
        tracing::info!("🔄 Client cache refreshed: {} records", count);
        Ok(count)
    }

    /// Hourly liveness ping to the operator.
    pub async fn heartbeat(&self) {
        if self.notify_operator(messages::HEARTBEAT).await {
            tracing::debug!("💓 Heartbeat sent");
        }
    }
}
