//! Real-time location broadcasting relay.
//!
//! Clients push GPS fixes over a persistent WebSocket connection; the relay
//! fans each fix out to subscribed sessions (the user's own room, group rooms,
//! global listeners) and records it in Postgres, falling back to a bounded
//! in-memory cache when the database is unreachable.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
pub mod config;
