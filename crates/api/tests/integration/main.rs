//! Integration tests for the CampusNet realtime API
//!
//! Everything runs against the in-memory store, so no database is needed.
//!
//! ## Running Tests
//! ```bash
//! cargo test -p campusnet-api --test integration
//! ```

mod chat_flow;
mod common;
mod http_api;
mod realtime_ws;
