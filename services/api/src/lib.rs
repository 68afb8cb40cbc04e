//! Parley API Library Crate
//!
//! This library contains the web-facing side of the chat service: configuration,
//! shared application state, the per-session registry, REST handlers, the
//! WebSocket chat endpoint and routing. The `api` binary is a thin wrapper
//! around this library.

pub mod audio;
pub mod config;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod router;
pub mod state;
pub mod ws;
