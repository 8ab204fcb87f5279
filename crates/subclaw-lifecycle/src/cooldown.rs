//! Per-user auto-reply cool-down.
//!
//! A reply slot is claimed before anything is sent, under the same lock that
//! checks the window, so concurrent messages from one user cannot both pass.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

/// A claimed reply slot. Hand it back with [`ReplyCooldown::release`] if no
/// reply went out.
#[derive(Debug)]
#[must_use]
pub struct Reservation {
    user: String,
    at: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
}

/// Last automated reply per general-user identifier.
#[derive(Debug)]
pub struct ReplyCooldown {
    window: Duration,
    last_reply: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ReplyCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_reply: Mutex::new(HashMap::new()),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        match self.last_reply.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Claim the reply slot for `user` at `now`. `None` while the user is
    /// still inside the window of an earlier reply or reservation.
    pub fn try_reserve(&self, user: &str, now: DateTime<Utc>) -> Option<Reservation> {
        let mut map = self.map();
        let previous = map.get(user).copied();
        if previous.is_some_and(|last| now - last < self.window) {
            return None;
        }
        map.insert(user.to_string(), now);
        Some(Reservation {
            user: user.to_string(),
            at: now,
            previous,
        })
    }

    /// Undo a reservation that produced no reply. A newer reservation for
    /// the same user is left alone.
    pub fn release(&self, reservation: Reservation) {
        let mut map = self.map();
        if map.get(&reservation.user) != Some(&reservation.at) {
            return;
        }
        match reservation.previous {
            Some(previous) => {
                map.insert(reservation.user, previous);
            }
            None => {
                map.remove(&reservation.user);
            }
        }
    }
}
