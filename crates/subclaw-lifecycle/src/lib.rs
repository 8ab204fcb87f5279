//! # SubClaw Lifecycle
//! The subscription lifecycle engine.
//!
//! ## Components
//! - **ClientCache**: wholesale-replaced snapshot of the backing sheet
//! - **BusyGate**: serializes cache mutations and bulk sends against
//!   interactive commands
//! - **Reminders**: daily sweep firing client reminders and operator alerts
//! - **Renewal**: extends an expiration, writes it back, refreshes the cache
//! - **Broadcast**: one promotional message per unique phone, paced
//! - **Earnings**: sale/purchase totals over today / this month / all
//! - **CommandDispatcher**: routes inbound chat text from the operator and
//!   from end users, with a per-user reply cool-down
//!
//! All components hang off one shared [`Lifecycle`].

pub mod broadcast;
pub mod cache;
pub mod cooldown;
pub mod dispatcher;
pub mod earnings;
pub mod engine;
pub mod gate;
pub mod messages;
pub mod records;
pub mod reminders;
pub mod renewal;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::BroadcastTally;
pub use cache::{CacheSnapshot, ClientCache};
pub use cooldown::{ReplyCooldown, Reservation};
pub use dispatcher::{CommandDispatcher, OperatorCommand, UserCommand};
pub use earnings::{EarningsReport, Period};
pub use engine::{Lifecycle, LifecycleSettings};
pub use gate::{BusyGate, BusyGuard};
pub use messages::Severity;
pub use reminders::{ReminderAction, SweepReport};
