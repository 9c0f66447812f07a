//! services/client/src/state/app.rs
//!
//! The application's shared services, constructed once at startup and passed
//! to whatever needs them.

use crate::adapters::FileKeyValueStore;
use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ClientResult;
use crate::state::groups::GroupsCache;
use crate::state::session::{SessionHolder, SessionState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use weave_core::{KeyValueStore, TokenStore, VideoCache};

//=========================================================================================
// AppState (Shared Across the Whole Client)
//=========================================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionHolder>,
    pub groups: Arc<GroupsCache>,
    pub videos: VideoCache,
}

impl AppState {
    /// Wires every service on top of the file-backed store in `config.data_dir`.
    pub fn new(config: Config) -> ClientResult<Self> {
        let kv = Arc::new(FileKeyValueStore::new(&config.data_dir));
        Self::with_store(config, kv)
    }

    /// Wires every service on top of an arbitrary key-value store.
    pub fn with_store(config: Config, kv: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        let config = Arc::new(config);
        let api = Arc::new(ApiClient::new(&config, TokenStore::new(kv))?);
        let session = Arc::new(SessionHolder::new(api.clone()));
        let groups = Arc::new(GroupsCache::new(api.clone()));

        Ok(Self {
            config,
            api,
            session,
            groups,
            videos: VideoCache::new(),
        })
    }

    /// Resolves the startup session from the stored token.
    pub async fn start(&self) -> SessionState {
        info!("Connecting to {}", self.api.base_url());
        self.session.restore().await
    }

    /// Spawns the task that reloads or clears groups as the session changes.
    pub fn spawn_group_sync(&self) -> JoinHandle<()> {
        self.groups.clone().follow_session(self.session.subscribe())
    }

    /// Drops all process-lifetime state. The stored token is left alone.
    pub fn shutdown(&self) {
        self.videos.clear();
        self.groups.clear();
        info!("Client state torn down");
    }
}
