//! The signed-in session: access token plus user profile.
//!
//! Token and profile are set and cleared together. The in-memory copy is
//! authoritative for readers and is swapped under one write lock only after
//! every persisted key has been written, so a reader sees either the whole
//! session or none of it.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use merysalud_core::UserProfile;

use crate::error::{StorageError, clear_sentry_user, set_sentry_user};
use crate::storage::{KeyValueStore, keys};

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub profile: UserProfile,
}

/// Holder of the current [`Session`], persisted in an injected store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store. Call [`restore`](Self::restore) to pick up a
    /// previously persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                current: RwLock::new(None),
            }),
        }
    }

    /// The key-value store backing this session.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.storage
    }

    /// Load the persisted session, if a complete one exists.
    ///
    /// A half-written session (token without profile, profile without
    /// token, or a profile that no longer parses) is removed from storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or repaired.
    pub async fn restore(&self) -> Result<Option<UserProfile>, StorageError> {
        let mut current = self.inner.current.write().await;
        let storage = &self.inner.storage;

        let token = storage.get(keys::ACCESS_TOKEN)?;
        let profile = storage.get(keys::CURRENT_USER)?;

        let restored = match (token, profile) {
            (None, None) => None,
            (Some(token), Some(raw)) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => Some(Session {
                    token: SecretString::from(token),
                    refresh_token: storage.get(keys::REFRESH_TOKEN)?.map(SecretString::from),
                    profile,
                }),
                Err(e) => {
                    warn!(error = %e, "Persisted profile is unreadable, clearing session");
                    remove_session_keys(storage.as_ref())?;
                    None
                }
            },
            (token, _) => {
                warn!(
                    has_token = token.is_some(),
                    "Persisted session is incomplete, clearing session"
                );
                remove_session_keys(storage.as_ref())?;
                None
            }
        };

        if let Some(session) = &restored {
            set_sentry_user(&session.profile.id, session.profile.email.as_deref());
            debug!(user_id = %session.profile.id, "Session restored");
        }
        let profile = restored.as_ref().map(|s| s.profile.clone());
        *current = restored;
        Ok(profile)
    }

    /// Persist and activate a new session.
    ///
    /// If any key fails to write, the keys already written are removed and
    /// the previous in-memory session stays in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    pub async fn establish(&self, session: Session) -> Result<(), StorageError> {
        let mut current = self.inner.current.write().await;
        let storage = self.inner.storage.as_ref();

        if let Err(e) = write_session_keys(storage, &session) {
            if let Err(rollback) = remove_session_keys(storage) {
                warn!(error = %rollback, "Failed to roll back partially written session");
            }
            return Err(e);
        }

        set_sentry_user(&session.profile.id, session.profile.email.as_deref());
        debug!(user_id = %session.profile.id, role = %session.profile.role, "Session established");
        *current = Some(session);
        Ok(())
    }

    /// Drop the session from memory and storage.
    ///
    /// The in-memory session is cleared even if storage fails.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` hit while removing the keys.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.inner.current.write().await;
        let had_session = current.take().is_some();
        clear_sentry_user();
        if had_session {
            debug!("Session cleared");
        }
        remove_session_keys(self.inner.storage.as_ref())
    }

    /// Current session, if any.
    pub async fn current(&self) -> Option<Session> {
        self.inner.current.read().await.clone()
    }

    /// Current access token, if any.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.token.clone())
    }

    /// Current user profile, if any.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.profile.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.current.read().await.is_some()
    }
}

fn write_session_keys(storage: &dyn KeyValueStore, session: &Session) -> Result<(), StorageError> {
    let profile = serde_json::to_string(&session.profile)?;
    storage.set(keys::ACCESS_TOKEN, session.token.expose_secret())?;
    match &session.refresh_token {
        Some(refresh) => storage.set(keys::REFRESH_TOKEN, refresh.expose_secret())?,
        None => storage.remove(keys::REFRESH_TOKEN)?,
    }
    storage.set(keys::CURRENT_USER, &profile)
}

/// Remove every session key, attempting all of them before reporting.
fn remove_session_keys(storage: &dyn KeyValueStore) -> Result<(), StorageError> {
    [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::CURRENT_USER]
        .into_iter()
        .map(|key| storage.remove(key))
        .fold(Ok(()), Result::and)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use merysalud_core::{Role, UserId};

    use super::*;
    use crate::storage::MemoryStore;

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new(3),
            display_name: "maria".to_string(),
            email: Some("maria@gmail.com".to_string()),
            role: Role::Customer,
            phone: None,
        }
    }

    fn session() -> Session {
        Session {
            token: SecretString::from("jwt-token"),
            refresh_token: Some(SecretString::from("refresh")),
            profile: profile(),
        }
    }

    #[tokio::test]
    async fn test_establish_persists_both_keys() {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(storage.clone());

        store.establish(session()).await.unwrap();

        assert_eq!(
            storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(),
            Some("jwt-token")
        );
        assert!(storage.get(keys::CURRENT_USER).unwrap().is_some());
        assert_eq!(store.profile().await, Some(profile()));
    }

    #[tokio::test]
    async fn test_restore_round_trips_through_storage() {
        let storage = Arc::new(MemoryStore::new());
        SessionStore::new(storage.clone())
            .establish(session())
            .await
            .unwrap();

        let fresh = SessionStore::new(storage);
        assert_eq!(fresh.restore().await.unwrap(), Some(profile()));
        assert_eq!(fresh.token().await.unwrap().expose_secret(), "jwt-token");
    }

    #[tokio::test]
    async fn test_restore_clears_orphaned_token() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::ACCESS_TOKEN, "orphan").unwrap();
        storage.set(keys::REFRESH_TOKEN, "orphan-refresh").unwrap();

        let store = SessionStore::new(storage.clone());
        assert_eq!(store.restore().await.unwrap(), None);
        assert!(!store.is_authenticated().await);
        assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::REFRESH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_clears_unreadable_profile() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::ACCESS_TOKEN, "token").unwrap();
        storage.set(keys::CURRENT_USER, "{\"id\": \"nope\"}").unwrap();

        let store = SessionStore::new(storage.clone());
        assert_eq!(store.restore().await.unwrap(), None);
        assert_eq!(storage.get(keys::CURRENT_USER).unwrap(), None);
        assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(storage.clone());
        store.establish(session()).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.current().await.is_none());
        assert!(store.token().await.is_none());
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::CURRENT_USER] {
            assert_eq!(storage.get(key).unwrap(), None);
        }
    }

    /// Store whose profile write always fails.
    struct ProfileWriteFails(MemoryStore);

    impl KeyValueStore for ProfileWriteFails {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == keys::CURRENT_USER {
                return Err(std::io::Error::other("disk full").into());
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    #[tokio::test]
    async fn test_failed_establish_rolls_back_written_keys() {
        let storage = Arc::new(ProfileWriteFails(MemoryStore::new()));
        let store = SessionStore::new(storage.clone());

        assert!(store.establish(session()).await.is_err());

        assert!(!store.is_authenticated().await);
        assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::REFRESH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_keeps_local_cart() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::LOCAL_CART, "[]").unwrap();
        let store = SessionStore::new(storage.clone());
        store.establish(session()).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(storage.get(keys::LOCAL_CART).unwrap().as_deref(), Some("[]"));
    }
}
