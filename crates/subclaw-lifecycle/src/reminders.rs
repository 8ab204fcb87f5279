//! Daily expiration sweep.
//!
//! Two offsets matter: a client whose service lapses today gets the full
//! reminder and the operator gets a second-notice alert; three days ahead
//! both get an early warning. Nothing is remembered between sweeps, so
//! running the sweep twice on one day notifies twice.

use chrono::NaiveDate;
use subclaw_core::error::{Result, SubClawError};
use subclaw_core::phone::normalize_phone;
use subclaw_core::types::ClientRecord;

use crate::engine::Lifecycle;
use crate::messages::{self, Severity};

pub const EARLY_WARNING_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    DueToday,
    EarlyWarning,
}

/// What the sweep does for a client expiring on `expiration`.
pub fn reminder_action(expiration: NaiveDate, today: NaiveDate) -> Option<ReminderAction> {
    match (expiration - today).num_days() {
        0 => Some(ReminderAction::DueToday),
        EARLY_WARNING_DAYS => Some(ReminderAction::EarlyWarning),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records with both a phone and an expiration date.
    pub checked: usize,
    pub due_today: usize,
    pub early_warning: usize,
    pub failed: usize,
}

impl Lifecycle {
    /// Run the sweep for the current local date, holding the gate.
    pub async fn sweep(&self) -> SweepReport {
        let _guard = self.gate().acquire("reminder-sweep").await;
        let today = self.today();
        tracing::info!("📅 Reminder sweep started for {}", today);
        let report = self.sweep_on(today).await;
        tracing::info!(
            "📅 Reminder sweep done for {}: checked={} due_today={} early_warning={} failed={}",
            today,
            report.checked,
            report.due_today,
            report.early_warning,
            report.failed
        );
        report
    }

    async fn sweep_on(&self, today: NaiveDate) -> SweepReport {
        let snapshot = self.cache().snapshot();
        let mut report = SweepReport::default();

        for client in snapshot.records() {
            let Some(expiration) = client.expiration_date else {
                continue;
            };
            if !client.has_phone() {
                continue;
            }
            report.checked += 1;

            let Some(action) = reminder_action(expiration, today) else {
                continue;
            };
            match self.remind(client, action).await {
                Ok(()) => match action {
                    ReminderAction::DueToday => report.due_today += 1,
                    ReminderAction::EarlyWarning => report.early_warning += 1,
                },
                Err(e) => {
                    tracing::warn!("⚠️ Reminder for {} ({}) failed: {}", client.name, client.id, e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn remind(&self, client: &ClientRecord, action: ReminderAction) -> Result<()> {
        let to = normalize_phone(&client.phone);
        let (client_text, operator_text) = match action {
            ReminderAction::DueToday => (
                messages::due_today_reminder(client),
                messages::operator_alert(client, Severity::SecondNotice),
            ),
            ReminderAction::EarlyWarning => (
                messages::early_warning(client),
                messages::early_warning_alert(client),
            ),
        };
        self.send(&to, &client_text).await?;
        self.send(self.operator_id(), &operator_text).await?;
        Ok(())
    }

    /// Send the operator the alert of the chosen severity for one client.
    pub async fn escalate(&self, id: &str, severity: Severity) -> Result<()> {
        let client = self
            .cache()
            .find_by_id(id)
            .ok_or_else(|| SubClawError::NotFound(id.to_string()))?;
        tracing::info!("📣 Manual {} alert for {}", severity, client.id);
        self.send(self.operator_id(), &messages::operator_alert(&client, severity))
            .await
    }
}
