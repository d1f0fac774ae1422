//! # Sitefile Client
//!
//! HTTP implementations of the editor's collaborators.
//!
//! ```text
//! SyncController ──▶ Services ──▶ HttpBackend ──▶ /api/parse
//!                                     │            /api/generate
//!                                     │            /api/validate
//!                                     │            /api/caddyfile (GET, POST)
//!                                     │            /api/reload
//!                                     │            /api/templates
//!                                     │            /api/headers
//!                                     │            /api/login
//!                                     ▼
//!                                 LocalState (auth token, panel splits)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sitefile_client::HttpBackend;
//! use sitefile_editor::{Services, SyncConfig, SyncController};
//!
//! let config = SyncConfig::default();
//! let backend = HttpBackend::new("http://127.0.0.1:5000", &config)?
//!     .with_state_file(".sitefile-state.json");
//! let controller = SyncController::new(Services::from_backend(Arc::new(backend)), config);
//! controller.load_document().await?;
//! ```

mod http;
mod local_state;
pub mod wire;

pub use http::HttpBackend;
pub use local_state::{LocalState, DEFAULT_STATE_NAME};
