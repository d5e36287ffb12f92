//! # Wicket
//!
//! Portal links for a webhook gateway: scoped, revocable bearer tokens that
//! let a project share a subset of its endpoints with an outside party.
//! Usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! wicket = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wicket::server::{AppState, create_router};
//! use wicket::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/wicket.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), None));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the admin CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
