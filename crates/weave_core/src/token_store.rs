//! crates/weave_core/src/token_store.rs
//!
//! Holds at most one bearer token on top of a [`KeyValueStore`].

use crate::ports::{KeyValueStore, PortResult};
use std::sync::Arc;
use tracing::error;

/// The storage key the bearer token lives under.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Durable home of the single bearer token. Last writer wins.
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Writes `token`, overwriting any previous one.
    pub async fn save(&self, token: &str) -> PortResult<()> {
        self.kv.set_item(AUTH_TOKEN_KEY, token).await
    }

    /// Reads the stored token. A failing backend reads as "no token".
    pub async fn load(&self) -> Option<String> {
        match self.kv.get_item(AUTH_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                error!("Failed to load auth token: {}", e);
                None
            }
        }
    }

    /// Deletes the stored token. Idempotent.
    pub async fn clear(&self) -> PortResult<()> {
        self.kv.remove_item(AUTH_TOKEN_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MemoryKeyValueStore, PortError};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get_item(&self, _key: &str) -> PortResult<Option<String>> {
            Err(PortError::Storage("disk on fire".to_string()))
        }
        async fn set_item(&self, _key: &str, _value: &str) -> PortResult<()> {
            Err(PortError::Storage("disk on fire".to_string()))
        }
        async fn remove_item(&self, _key: &str) -> PortResult<()> {
            Err(PortError::Storage("disk on fire".to_string()))
        }
    }

    fn memory_store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn load_returns_last_saved_token() {
        let store = memory_store();
        store.save("t1").await.unwrap();
        store.save("t2").await.unwrap();
        store.save("t3").await.unwrap();

        assert_eq!(store.load().await.as_deref(), Some("t3"));
    }

    #[tokio::test]
    async fn clear_is_idempotent_and_empties_the_store() {
        let store = memory_store();
        store.save("t1").await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn failing_backend_loads_as_absent() {
        let store = TokenStore::new(Arc::new(BrokenStore));

        assert_eq!(store.load().await, None);
        assert!(store.save("t1").await.is_err());
    }

    #[tokio::test]
    async fn empty_token_is_treated_as_absent() {
        let store = memory_store();
        store.save("").await.unwrap();

        assert_eq!(store.load().await, None);
    }
}
