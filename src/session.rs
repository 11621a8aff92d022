//! The client's identity: who is logged in and with which bearer token.
//!
//! [`SessionStore`] is the single owner of that state. It is shared as an
//! `Arc` and handed to whatever needs it; nothing reads the persisted keys
//! directly.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::auth::guard::Access;
use crate::auth::jwt;
use crate::error::{ClientError, ClientResult};
use crate::models::user::UserProfile;
use crate::storage::{self, Storage, CSRF_KEY, TOKEN_KEY, USER_KEY};

/// Snapshot of the session. `is_authenticated` holds exactly when both
/// the user and the token are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    user: Option<UserProfile>,
    token: Option<String>,
    is_authenticated: bool,
}

impl Session {
    pub fn new(user: Option<UserProfile>, token: Option<String>) -> Self {
        let is_authenticated = user.is_some() && token.is_some();
        Self {
            user,
            token,
            is_authenticated,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn access(&self) -> Access {
        Access::of(self)
    }
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: RwLock<Session>,
}

impl SessionStore {
    /// Start anonymous, ignoring anything persisted.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            state: RwLock::new(Session::anonymous()),
        }
    }

    /// Rebuild the session from storage. Half a credential (user without
    /// token or the reverse), an unreadable user, or a JWT that has already
    /// expired all load as anonymous.
    pub fn restore(storage: Arc<dyn Storage>) -> Self {
        let user = storage::get_or_absent(storage.as_ref(), USER_KEY).and_then(|raw| {
            serde_json::from_str::<UserProfile>(&raw)
                .map_err(|e| tracing::warn!(error = %e, "Discarding unreadable stored user"))
                .ok()
        });

        let token = storage::get_or_absent(storage.as_ref(), TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .filter(|t| {
                let expired = jwt::is_expired(t, Utc::now());
                if expired {
                    tracing::info!("Stored token has expired");
                }
                !expired
            });

        let session = match (user, token) {
            (Some(user), Some(token)) => Session::new(Some(user), Some(token)),
            (None, None) => Session::anonymous(),
            _ => {
                tracing::info!("Ignoring partial stored credentials");
                Session::anonymous()
            }
        };

        tracing::debug!(authenticated = session.is_authenticated(), "Session restored");

        Self {
            storage,
            state: RwLock::new(session),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.read().clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated
    }

    pub fn access(&self) -> Access {
        self.state.read().access()
    }

    /// Whether admin-only controls may be shown. Navigation itself is
    /// gated by the route guard.
    pub fn is_admin(&self) -> bool {
        self.access() == Access::Admin
    }

    pub fn login(&self, user: UserProfile, token: String) {
        let mut state = self.state.write();

        match serde_json::to_string(&user) {
            Ok(raw) => storage::set_or_warn(self.storage.as_ref(), USER_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize user"),
        }
        storage::set_or_warn(self.storage.as_ref(), TOKEN_KEY, &token);

        *state = Session::new(Some(user), Some(token));
        tracing::info!("Logged in");
    }

    pub fn logout(&self) {
        let mut state = self.state.write();
        self.clear_persisted();
        *state = Session::anonymous();
        tracing::info!("Logged out");
    }

    /// Shallow-merge `partial` into the current user and persist the result.
    /// The token and the authentication flag are left alone.
    pub fn update_user(&self, partial: &Map<String, Value>) -> ClientResult<UserProfile> {
        let mut state = self.state.write();

        let merged = match &state.user {
            Some(user) => user.merged(partial)?,
            None => UserProfile::from_patch(partial)?,
        };

        let raw = serde_json::to_string(&merged)?;
        storage::set_or_warn(self.storage.as_ref(), USER_KEY, &raw);

        let token = state.token.take();
        *state = Session::new(Some(merged.clone()), token);
        Ok(merged)
    }

    /// Same as [`update_user`](Self::update_user) for a JSON value that
    /// must be an object.
    pub fn update_user_value(&self, partial: &Value) -> ClientResult<UserProfile> {
        match partial {
            Value::Object(map) => self.update_user(map),
            _ => Err(ClientError::Decode("user update must be a JSON object".into())),
        }
    }

    /// Tear the session down after the backend rejected `token`, but only
    /// if `token` is still the current one. Returns whether anything was
    /// torn down, so concurrent rejections of the same token evict once.
    pub fn evict_if_current(&self, token: &str) -> bool {
        let mut state = self.state.write();
        if state.token.as_deref() != Some(token) {
            return false;
        }

        self.clear_persisted();
        *state = Session::anonymous();
        tracing::warn!("Session evicted after the backend rejected the token");
        true
    }

    fn clear_persisted(&self) {
        storage::remove_or_warn(self.storage.as_ref(), USER_KEY);
        storage::remove_or_warn(self.storage.as_ref(), TOKEN_KEY);
        storage::remove_or_warn(self.storage.as_ref(), CSRF_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{CityRef, Role};
    use crate::storage::{MemoryStorage, UnavailableStorage};
    use serde_json::json;

    fn alice() -> UserProfile {
        serde_json::from_value(json!({"id": 1, "username": "alice", "role": "user"})).unwrap()
    }

    fn memory() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_session_invariant() {
        assert!(Session::new(Some(alice()), Some("tok".into())).is_authenticated());
        assert!(!Session::new(Some(alice()), None).is_authenticated());
        assert!(!Session::new(None, Some("tok".into())).is_authenticated());
        assert!(!Session::anonymous().is_authenticated());
    }

    #[test]
    fn test_login_persists_and_restores() {
        let storage = memory();
        let store = SessionStore::new(storage.clone());
        store.login(alice(), "tok".into());

        assert!(store.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok"));

        let restored = SessionStore::restore(storage);
        assert!(restored.is_authenticated());
        assert_eq!(restored.user().unwrap().username, "alice");
    }

    #[test]
    fn test_partial_credentials_are_not_trusted() {
        let storage = memory();
        storage.set(USER_KEY, r#"{"id":1,"username":"alice"}"#).unwrap();
        let store = SessionStore::restore(storage.clone());
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());

        let storage = memory();
        storage.set(TOKEN_KEY, "tok").unwrap();
        assert!(!SessionStore::restore(storage).is_authenticated());
    }

    #[test]
    fn test_unreadable_user_is_discarded() {
        let storage = memory();
        storage.set(USER_KEY, "{not json").unwrap();
        storage.set(TOKEN_KEY, "tok").unwrap();
        assert!(!SessionStore::restore(storage).is_authenticated());
    }

    #[test]
    fn test_disabled_storage_restores_anonymous() {
        let store = SessionStore::restore(Arc::new(UnavailableStorage));
        assert!(!store.is_authenticated());

        // In-memory login still works without persistence.
        store.login(alice(), "tok".into());
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_logout_clears_everything() {
        let storage = memory();
        let store = SessionStore::new(storage.clone());
        store.login(alice(), "tok".into());
        storage.set(CSRF_KEY, "csrf").unwrap();

        store.logout();
        assert_eq!(store.snapshot(), Session::anonymous());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_update_user_merges() {
        let storage = memory();
        let store = SessionStore::new(storage.clone());
        store.login(alice(), "tok".into());

        store.update_user_value(&json!({"city": "X"})).unwrap();

        let user = store.user().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.city, Some(CityRef::Name("X".into())));
        assert_eq!(user.role, Role::User);
        assert_eq!(store.token().as_deref(), Some("tok"));
        assert!(store.is_authenticated());

        let persisted: UserProfile =
            serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, user);
    }

    #[test]
    fn test_evict_only_current_token() {
        let store = SessionStore::new(memory());
        store.login(alice(), "new".into());

        assert!(!store.evict_if_current("old"));
        assert!(store.is_authenticated());

        assert!(store.evict_if_current("new"));
        assert!(!store.is_authenticated());
        assert!(!store.evict_if_current("new"));
    }

    #[test]
    fn test_admin_access() {
        let store = SessionStore::new(memory());
        assert_eq!(store.access(), Access::Anonymous);

        let admin: UserProfile =
            serde_json::from_value(json!({"id": 2, "username": "root", "role": "admin"})).unwrap();
        store.login(admin, "tok".into());
        assert!(store.is_admin());
    }
}
