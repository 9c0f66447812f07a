//! crates/weave_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! Concrete storage lives behind these traits so the token lifecycle can be
//! exercised without touching the disk.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable string key-value storage, the primitive the token store sits on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when the key is absent.
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    /// Stores `value` under `key`, replacing any prior value.
    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    /// Deletes `key`. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// In-Memory Implementation
//=========================================================================================

/// A process-lifetime key-value store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}
