//! BusyGate — one process-wide "a bulk or mutating operation is running" lock.
//!
//! Scheduled jobs and operator-triggered bulk operations take the gate with
//! [`BusyGate::acquire`] and wait their turn. Interactive command handling
//! never waits: it asks [`BusyGate::is_busy`] and answers with a busy notice.
//! Release is tied to dropping the [`BusyGuard`], so every exit path
//! (return, `?`, panic unwinding) releases it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct BusyGate {
    lock: Arc<Mutex<()>>,
    busy: Arc<AtomicBool>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate and hold it until the guard is dropped.
    pub async fn acquire(&self, operation: &'static str) -> BusyGuard {
        let guard = self.lock.clone().lock_owned().await;
        self.hold(guard, operation)
    }

    /// Take the gate only if nobody holds it.
    pub fn try_acquire(&self, operation: &'static str) -> Option<BusyGuard> {
        let guard = self.lock.clone().try_lock_owned().ok()?;
        Some(self.hold(guard, operation))
    }

    fn hold(&self, guard: OwnedMutexGuard<()>, operation: &'static str) -> BusyGuard {
        self.busy.store(true, Ordering::SeqCst);
        tracing::debug!("🔒 Busy gate taken by {}", operation);
        BusyGuard {
            _guard: guard,
            busy: self.busy.clone(),
            operation,
        }
    }

    /// Whether some operation currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Proof that the gate is held. Dropping it releases the gate.
#[derive(Debug)]
pub struct BusyGuard {
    _guard: OwnedMutexGuard<()>,
    busy: Arc<AtomicBool>,
    operation: &'static str,
}

impl BusyGuard {
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
        tracing::debug!("🔓 Busy gate released by {}", self.operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = BusyGate::new();
        assert!(!gate.is_busy());
        {
            let guard = gate.acquire("refresh").await;
            assert!(gate.is_busy());
            assert_eq!(guard.operation(), "refresh");
            assert!(gate.try_acquire("broadcast").is_none());
        }
        assert!(!gate.is_busy());
        assert!(gate.try_acquire("broadcast").is_some());
    }

    #[tokio::test]
    async fn test_released_on_error_path() {
        async fn failing(gate: &BusyGate) -> Result<(), String> {
            let _guard = gate.acquire("sweep").await;
            Err("store down".into())
        }
        let gate = BusyGate::new();
        assert!(failing(&gate).await.is_err());
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn test_released_on_panic() {
        let gate = BusyGate::new();
        let inner = gate.clone();
        let handle = tokio::spawn(async move {
            let _guard = inner.acquire("broadcast").await;
            panic!("boom");
        });
        assert!(handle.await.is_err());
        assert!(!gate.is_busy());
        assert!(gate.try_acquire("refresh").is_some());
    }

    #[tokio::test]
    async fn test_waiters_are_serialized() {
        let gate = BusyGate::new();
        let first = gate.acquire("refresh").await;

        let waiter = gate.clone();
        let handle = tokio::spawn(async move {
            let _guard = waiter.acquire("sweep").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(first);
        handle.await.unwrap();
        assert!(!gate.is_busy());
    }
}
