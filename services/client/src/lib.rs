//! services/client/src/lib.rs
//!
//! Client library for the Weave backend: configuration, the authenticated API
//! client, session and group state, and the file-backed token storage.

pub mod adapters;
pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::{ApiClient, VideoUpload};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use state::{AppState, GroupsCache, SessionHolder, SessionState};
