//! Scheduler Engine — the main loop that checks and triggers jobs.
//! Uses tokio::interval for zero-overhead ticking (sleeps between checks).

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;
use subclaw_core::error::{Result, SubClawError};
use tokio::sync::Mutex;

use crate::tasks::{Job, JobCallback, JobSchedule};

/// The scheduler engine — holds jobs and decides which are due.
pub struct SchedulerEngine {
    jobs: Vec<Job>,
    tz: Tz,
}

impl SchedulerEngine {
    /// Create an engine evaluating every schedule in `tz`.
    pub fn new(tz: Tz) -> Self {
        Self {
            jobs: Vec::new(),
            tz,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Register an async job.
    pub fn add_job<F, Fut>(&mut self, name: &str, schedule: JobSchedule, f: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: JobCallback = Arc::new(move || Box::pin(f()) as BoxFuture<'static, ()>);
        self.add_callback(name, schedule, callback, Utc::now())
    }

    /// Register a prebuilt callback, computing its first run after `now`.
    pub fn add_callback(
        &mut self,
        name: &str,
        schedule: JobSchedule,
        callback: JobCallback,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !schedule.is_valid() {
            return Err(SubClawError::Scheduler(format!(
                "Job '{name}' has an invalid schedule: {schedule}"
            )));
        }
        if self.jobs.iter().any(|j| j.name == name) {
            return Err(SubClawError::Scheduler(format!("Job '{name}' already registered")));
        }

        let mut job = Job::new(name, schedule, callback);
        job.next_run = job.schedule.next_after(now, self.tz);
        tracing::info!(
            "📅 Job added: '{}' ({}), next run {:?}",
            job.name,
            job.schedule,
            job.next_run
        );
        self.jobs.push(job);
        Ok(())
    }

    /// Remove a job by name.
    pub fn remove_job(&mut self, name: &str) -> bool {
        let len = self.jobs.len();
        self.jobs.retain(|j| j.name != name);
        self.jobs.len() < len
    }

    /// List all jobs.
    pub fn list_jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Collect due jobs and advance their next run.
    /// Returns (name, callback) for each job that fired.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<(String, JobCallback)> {
        let mut due = Vec::new();

        for job in self.jobs.iter_mut() {
            if !job.should_run(now) {
                continue;
            }

            tracing::info!("🔔 Job triggered: '{}'", job.name);
            job.last_run = Some(now);
            job.run_count += 1;
            job.next_run = job.schedule.next_after(now, self.tz);
            due.push((job.name.clone(), job.callback.clone()));
        }

        due
    }
}

/// Spawn the scheduler loop. Every due callback runs on its own tokio task so
/// a slow job never delays the next tick.
pub async fn spawn_scheduler(engine: Arc<Mutex<SchedulerEngine>>, check_interval_secs: u64) {
    tracing::info!(
        "⏰ Scheduler started (check every {}s)",
        check_interval_secs
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(check_interval_secs.max(1)));

    loop {
        interval.tick().await;

        let due = {
            let mut eng = engine.lock().await;
            eng.tick(Utc::now())
        };

        for (name, callback) in due {
            tracing::debug!("▶️ Running job '{}'", name);
            tokio::spawn(callback());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_callback(counter: Arc<AtomicU32>) -> JobCallback {
        Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }) as BoxFuture<'static, ()>
        })
    }

    #[test]
    fn test_add_and_list() {
        let mut engine = SchedulerEngine::new(chrono_tz::UTC);
        engine
            .add_job("heartbeat", JobSchedule::cron("0 * * * *"), || async {})
            .unwrap();
        assert_eq!(engine.job_count(), 1);
        assert!(engine.list_jobs()[0].next_run.is_some());
        assert!(engine.remove_job("heartbeat"));
        assert_eq!(engine.job_count(), 0);
    }

    #[test]
    fn test_rejects_invalid_and_duplicate() {
        let mut engine = SchedulerEngine::new(chrono_tz::UTC);
        assert!(engine.add_job("bad", JobSchedule::cron("nope"), || async {}).is_err());
        assert!(
            engine
                .add_job("late", JobSchedule::DailyAt { hour: 25, minute: 0 }, || async {})
                .is_err()
        );
        engine.add_job("a", JobSchedule::cron("0 * * * *"), || async {}).unwrap();
        assert!(engine.add_job("a", JobSchedule::cron("0 * * * *"), || async {}).is_err());
    }

    #[tokio::test]
    async fn test_tick_fires_due_job_once() {
        let mut engine = SchedulerEngine::new(chrono_tz::America::Santo_Domingo);
        let counter = Arc::new(AtomicU32::new(0));
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        engine
            .add_callback(
                "reminder-sweep",
                JobSchedule::DailyAt { hour: 11, minute: 40 },
                counting_callback(counter.clone()),
                start,
            )
            .unwrap();

        // 11:40 in Santo Domingo is 15:40 UTC.
        let due_at = Utc.with_ymd_and_hms(2026, 3, 1, 15, 40, 0).unwrap();
        assert!(engine.tick(due_at - chrono::Duration::minutes(1)).is_empty());

        let due = engine.tick(due_at);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, "reminder-sweep");
        (due[0].1)().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Same instant again: already advanced to tomorrow.
        assert!(engine.tick(due_at).is_empty());
        let job = &engine.list_jobs()[0];
        assert_eq!(job.run_count, 1);
        assert_eq!(
            job.next_run,
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 15, 40, 0).unwrap())
        );
    }
}
