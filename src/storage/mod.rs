//! String key/value persistence, the client's equivalent of browser
//! `localStorage`.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, UnavailableStorage};

use crate::error::ClientResult;

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";
pub const CSRF_KEY: &str = "csrf_token";
pub const DIARY_KEY: &str = "df_diary";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// Read a key, treating a failing store the same as a missing entry.
pub fn get_or_absent(storage: &dyn Storage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Storage read failed, treating entry as absent");
            None
        }
    }
}

/// Write a key, logging instead of failing when the store is unavailable.
pub fn set_or_warn(storage: &dyn Storage, key: &str, value: &str) {
    if let Err(e) = storage.set(key, value) {
        tracing::warn!(key = key, error = %e, "Storage write failed");
    }
}

pub fn remove_or_warn(storage: &dyn Storage, key: &str) {
    if let Err(e) = storage.remove(key) {
        tracing::warn!(key = key, error = %e, "Storage remove failed");
    }
}
