//! # SubClaw Gateway
//! HTTP surface: the WhatsApp Cloud API webhook and a health endpoint.

pub mod routes;
pub mod server;
pub mod signature;

pub use server::{AppState, build_router, start_server};
