//! # SubClaw Core
//! Shared building blocks for the SubClaw workspace.
//!
//! - `config`: TOML configuration with env overrides for secrets
//! - `error`: the single `SubClawError` type used across crates
//! - `types`: client records and inbound chat messages
//! - `traits`: seams to the outside world (chat transport, tabular store, clock)
//! - `phone`: contact identifier normalization

pub mod config;
pub mod error;
pub mod phone;
pub mod traits;
pub mod types;

pub use config::SubClawConfig;
pub use error::{Result, SubClawError};
pub use phone::{normalize_phone, to_digits};
pub use traits::{ChatTransport, Clock, SystemClock, TabularStore};
pub use types::{ClientRecord, IncomingMessage};
