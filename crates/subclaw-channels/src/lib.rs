//! # SubClaw Channels
//! Chat transport implementations.

pub mod whatsapp;

pub use whatsapp::{WhatsAppTransport, parse_webhook_payload};
