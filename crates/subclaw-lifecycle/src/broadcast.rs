//! Promotional broadcast to every unique client phone.

use std::collections::HashSet;

use subclaw_core::phone::normalize_phone;
use subclaw_core::types::ClientRecord;

use crate::engine::Lifecycle;
use crate::messages;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastTally {
    pub sent: usize,
    pub failed: usize,
}

/// First record per normalized phone, in cache order. Records without a
/// phone are skipped.
pub fn unique_recipients(records: &[ClientRecord]) -> Vec<&ClientRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|c| c.has_phone() && seen.insert(normalize_phone(&c.phone)))
        .collect()
}

impl Lifecycle {
    /// Send `message` under the broadcast banner to every unique phone, then
    /// report the tally to `requester`. Holds the gate throughout.
    pub async fn broadcast(&self, requester: &str, message: &str) -> BroadcastTally {
        let _guard = self.gate().acquire("broadcast").await;
        let _ = self.send(requester, messages::BROADCAST_STARTED).await;

        let snapshot = self.cache().snapshot();
        let recipients = unique_recipients(snapshot.records());
        let text = messages::broadcast_banner(message);
        let delay = self.settings().broadcast_delay;
        tracing::info!("📢 Broadcasting to {} recipients", recipients.len());

        let mut tally = BroadcastTally::default();
        for (i, client) in recipients.iter().enumerate() {
            let to = normalize_phone(&client.phone);
            match self.send(&to, &text).await {
                Ok(()) => tally.sent += 1,
                Err(_) => tally.failed += 1,
            }
            if i + 1 < recipients.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!("📢 Broadcast done: sent={} failed={}", tally.sent, tally.failed);
        let _ = self
            .send(requester, &messages::broadcast_tally(tally.sent, tally.failed))
            .await;
        tally
    }
}
