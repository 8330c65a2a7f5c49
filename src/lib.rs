//! # Syncroom
//!
//! A multi-tenant real-time file synchronization server, usable both as a
//! standalone binary and as a library.
//!
//! Clients belonging to a tenant connect over a WebSocket event channel
//! and/or the HTTP API, emit file lifecycle events, and receive broadcasts
//! of all other clients' changes within the same tenant. The server keeps
//! the authoritative file contents, assigns content hashes, and enforces
//! soft-delete semantics with tombstone retention.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use syncroom::server::{AppState, create_router};
//! use syncroom::store::{SqliteStore, Store};
//! use tower_http::cors::CorsLayer;
//!
//! let store = SqliteStore::new("./data/syncroom.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), None));
//! let router = create_router(state, CorsLayer::new());
//! // Serve with axum...
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod sync;
pub mod types;
pub mod validation;
