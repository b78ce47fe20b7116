//! Session token persistence.
//!
//! A process-local key-value store standing in for the browser's local
//! storage: four fixed keys hold the access token, the refresh token, the
//! serialized user, and the serialized profile. Reads and writes are
//! synchronous; the handle is cheap to clone and every clone sees the latest
//! values, so any component can read the current session. No encryption, no
//! expiry - a token stays until the backend rejects it or sign-out clears it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{Profile, Session, User};

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "vc_access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "vc_refresh_token";
/// Storage key for the serialized user.
pub const USER_KEY: &str = "vc_user";
/// Storage key for the serialized profile.
pub const PROFILE_KEY: &str = "vc_profile";

/// Process-local persistence for the current session.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl TokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned lock only means a writer panicked mid-insert; the map
        // itself is still a valid string map.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Raw key-value surface
    // =========================================================================

    /// Read a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    /// Write a raw value.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.entries().insert(key.to_owned(), value.into());
    }

    /// Remove a raw value.
    pub fn remove(&self, key: &str) {
        self.entries().remove(key);
    }

    // =========================================================================
    // Session-shaped surface
    // =========================================================================

    /// The stored access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY)
    }

    /// Store just the access token.
    pub fn set_access_token(&self, token: impl Into<String>) {
        self.set(ACCESS_TOKEN_KEY, token);
    }

    /// The stored refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY)
    }

    /// Store just the refresh token.
    pub fn set_refresh_token(&self, token: impl Into<String>) {
        self.set(REFRESH_TOKEN_KEY, token);
    }

    /// The stored user, if present and parseable.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.get(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Serialize and store the user.
    pub fn save_user(&self, user: &User) {
        if let Ok(raw) = serde_json::to_string(user) {
            self.set(USER_KEY, raw);
        }
    }

    /// The stored profile, if present and parseable.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.get(PROFILE_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Serialize and store the profile.
    pub fn save_profile(&self, profile: &Profile) {
        if let Ok(raw) = serde_json::to_string(profile) {
            self.set(PROFILE_KEY, raw);
        }
    }

    /// Persist a full session: tokens plus serialized user.
    pub fn save_session(&self, session: &Session) {
        self.set_access_token(session.access_token.clone());
        match &session.refresh_token {
            Some(token) => self.set_refresh_token(token.clone()),
            None => self.remove(REFRESH_TOKEN_KEY),
        }
        self.save_user(&session.user);
    }

    /// Reassemble the persisted session, if both token and user are present.
    #[must_use]
    pub fn load_session(&self) -> Option<Session> {
        let access_token = self.access_token()?;
        let user = self.user()?;
        Some(Session {
            access_token,
            refresh_token: self.refresh_token(),
            user,
        })
    }

    /// Remove all four session keys.
    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.remove(ACCESS_TOKEN_KEY);
        entries.remove(REFRESH_TOKEN_KEY);
        entries.remove(USER_KEY);
        entries.remove(PROFILE_KEY);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vendor_connect_core::UserId;

    use super::*;

    fn sample_user() -> User {
        serde_json::from_value(serde_json::json!({ "id": "u1", "email": "a@b.com" })).unwrap()
    }

    #[test]
    fn test_session_roundtrip() {
        let store = TokenStore::new();
        let session = Session {
            access_token: "t1".to_string(),
            refresh_token: Some("r1".to_string()),
            user: sample_user(),
        };

        store.save_session(&session);

        let loaded = store.load_session().unwrap();
        assert_eq!(loaded.access_token, "t1");
        assert_eq!(loaded.refresh_token.as_deref(), Some("r1"));
        assert_eq!(loaded.user.id, UserId::new("u1"));
    }

    #[test]
    fn test_load_session_requires_token_and_user() {
        let store = TokenStore::new();
        assert!(store.load_session().is_none());

        store.set_access_token("t1");
        assert!(store.load_session().is_none());
    }

    #[test]
    fn test_save_session_drops_stale_refresh_token() {
        let store = TokenStore::new();
        store.set_refresh_token("old");

        store.save_session(&Session {
            access_token: "t1".to_string(),
            refresh_token: None,
            user: sample_user(),
        });

        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let store = TokenStore::new();
        store.set_access_token("t1");
        store.set_refresh_token("r1");
        store.save_user(&sample_user());
        store.set(PROFILE_KEY, "{}");

        store.clear();

        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).is_none());
        assert!(store.get(USER_KEY).is_none());
        assert!(store.get(PROFILE_KEY).is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = TokenStore::new();
        let clone = store.clone();

        store.set_access_token("t1");
        assert_eq!(clone.access_token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_corrupt_user_reads_as_none() {
        let store = TokenStore::new();
        store.set(USER_KEY, "{not json");
        assert!(store.user().is_none());
    }
}
