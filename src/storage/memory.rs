use std::collections::HashMap;

use parking_lot::RwLock;

use super::Storage;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// A store that refuses every operation, as a browser does with storage
/// disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl Storage for UnavailableStorage {
    fn get(&self, _key: &str) -> ClientResult<Option<String>> {
        Err(ClientError::Storage("storage is disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> ClientResult<()> {
        Err(ClientError::Storage("storage is disabled".into()))
    }

    fn remove(&self, _key: &str) -> ClientResult<()> {
        Err(ClientError::Storage("storage is disabled".into()))
    }
}
