//! Job definitions — the data model for scheduled work.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;

use crate::cron::CronSpec;

/// Zero-argument async callback fired when a job is due.
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// How/when the job triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSchedule {
    /// Lightweight cron expression.
    Cron { expression: String },
    /// Every day at a fixed local time.
    DailyAt { hour: u32, minute: u32 },
}

impl JobSchedule {
    pub fn cron(expression: &str) -> Self {
        Self::Cron {
            expression: expression.to_string(),
        }
    }

    fn spec(&self) -> Option<CronSpec> {
        match self {
            JobSchedule::Cron { expression } => CronSpec::parse(expression),
            JobSchedule::DailyAt { hour, minute } => CronSpec::daily(*hour, *minute),
        }
    }

    /// Next fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        self.spec()?.next_after(after, tz)
    }

    pub fn is_valid(&self) -> bool {
        self.spec().is_some()
    }
}

impl std::fmt::Display for JobSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSchedule::Cron { expression } => write!(f, "cron '{expression}'"),
            JobSchedule::DailyAt { hour, minute } => write!(f, "daily {hour:02}:{minute:02}"),
        }
    }
}

/// A registered job.
#[derive(Clone)]
pub struct Job {
    /// Human-readable name, unique within an engine.
    pub name: String,
    pub schedule: JobSchedule,
    pub callback: JobCallback,
    /// Last triggered timestamp.
    pub last_run: Option<DateTime<Utc>>,
    /// Next scheduled run.
    pub next_run: Option<DateTime<Utc>>,
    /// How many times this job has fired.
    pub run_count: u32,
}

impl Job {
    pub fn new(name: &str, schedule: JobSchedule, callback: JobCallback) -> Self {
        Self {
            name: name.to_string(),
            schedule,
            callback,
            last_run: None,
            next_run: None,
            run_count: 0,
        }
    }

    /// Whether the job is due at `now`.
    pub fn should_run(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| now >= next)
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("last_run", &self.last_run)
            .field("next_run", &self.next_run)
            .field("run_count", &self.run_count)
            .finish()
    }
}
