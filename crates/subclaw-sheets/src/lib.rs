//! # SubClaw Sheets
//! Google Sheets API v4 (`spreadsheets.values`) client.
//!
//! Only the two calls the engine needs: read a range, write one cell.
//! Authentication is an OAuth bearer token, refreshed from a refresh token
//! when client credentials are configured.

pub mod auth;
pub mod client;

pub use auth::TokenProvider;
pub use client::SheetsStore;
