//! # SubClaw Scheduler
//!
//! Tiny wall-clock job scheduler: the engine registers zero-argument async
//! callbacks against cron expressions or a daily `{hour, minute}`, and a tokio
//! interval loop fires whatever is due.
//!
//! ## Architecture
//! ```text
//! Scheduler (tokio interval, every check_interval_secs)
//!   ├── refresh-cache:  "0 * * * *"      → cache refresh
//!   ├── reminder-sweep: daily 11:40 (tz) → reminder sweep
//!   └── heartbeat:      "0 * * * *"      → "still alive" to the operator
//! ```
//!
//! All schedules are evaluated in one configured timezone.

pub mod cron;
pub mod engine;
pub mod tasks;

pub use engine::{SchedulerEngine, spawn_scheduler};
pub use tasks::{Job, JobCallback, JobSchedule};
