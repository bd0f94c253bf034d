// SPDX-License-Identifier: MIT

//! File-backed JSON store for users and exchange settings.
//!
//! The whole user collection lives in one `users.json` document that is
//! read and rewritten as a unit, so a matching round always persists
//! against the snapshot it was computed from. Writes go through a temp
//! file and rename so a crash never leaves a half-written document.

use crate::models::{GiftPreferences, User};
use crate::store::files;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("User {0} not found")]
    UserNotFound(u64),

    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),
}

/// On-disk shape of users.json.
///
/// `nextId` is a monotonic counter so ids are never reused, even after
/// a user is deleted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersFile {
    users: Vec<User>,
    #[serde(default)]
    next_id: u64,
}

/// Exchange-wide settings stored in config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSettings {
    /// Suggested gift price range shown to participants
    pub price_range: String,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            price_range: "25-50".to_string(),
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Handle to the JSON store, cloneable and shared through `AppState`.
#[derive(Clone)]
pub struct UserStore {
    inner: Arc<Inner>,
}

struct Inner {
    users_path: PathBuf,
    settings_path: PathBuf,
    /// Serializes writes to users.json and config.json; both share the
    /// temp-file path scheme in `write_atomic`, so unordered writers
    /// could publish a torn document
    write_lock: Mutex<()>,
}

impl UserStore {
    /// Create a store rooted at `data_dir`. Call [`initialize`] before use.
    ///
    /// [`initialize`]: UserStore::initialize
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref();
        Self {
            inner: Arc::new(Inner {
                users_path: dir.join(files::USERS),
                settings_path: dir.join(files::SETTINGS),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Ensure the data directory, settings file, and admin account exist.
    pub async fn initialize(&self, admin_password_hash: &str) -> Result<(), StoreError> {
        if let Some(dir) = self.inner.users_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let _guard = self.inner.write_lock.lock().await;

        if !self.inner.settings_path.exists() {
            self.write_settings(&ExchangeSettings::default()).await?;
            tracing::info!(path = %self.inner.settings_path.display(), "Created default settings");
        }

        let mut file = self.read_users_file().await?;

        if !file.users.iter().any(|u| u.is_admin) {
            let id = file.allocate_id();
            file.users.push(User {
                id,
                username: "admin".to_string(),
                email: None,
                password_hash: admin_password_hash.to_string(),
                is_admin: true,
                ready: false,
                matched_with: None,
                gift_preferences: GiftPreferences::default(),
                created_at: chrono::Utc::now().to_rfc3339(),
            });
            self.write_users_file(&file).await?;
            tracing::info!(id, "Seeded admin account");
        }

        Ok(())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Load the full user collection.
    pub async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read_users_file().await?.users)
    }

    /// Replace the full user collection, preserving the id counter.
    pub async fn save_users(&self, users: &[User]) -> Result<(), StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut file = self.read_users_file().await?;
        file.users = users.to_vec();
        self.write_users_file(&file).await
    }

    /// Look up a user by id.
    pub async fn get_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.get_users().await?.into_iter().find(|u| u.id == id))
    }

    /// Look up a user by username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .get_users()
            .await?
            .into_iter()
            .find(|u| u.username == username))
    }

    /// Create a user with a freshly allocated id.
    pub async fn add_user(&self, new: NewUser) -> Result<User, StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut file = self.read_users_file().await?;

        if file.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::DuplicateUsername(new.username));
        }

        let user = User {
            id: file.allocate_id(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_admin: new.is_admin,
            ready: false,
            matched_with: None,
            gift_preferences: GiftPreferences::default(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        file.users.push(user.clone());
        self.write_users_file(&file).await?;
        Ok(user)
    }

    /// Apply `f` to the user with the given id and persist the result.
    pub async fn update_user<F>(&self, id: u64, f: F) -> Result<User, StoreError>
    where
        F: FnOnce(&User) -> User,
    {
        let _guard = self.inner.write_lock.lock().await;
        let mut file = self.read_users_file().await?;

        let slot = file
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::UserNotFound(id))?;

        let updated = f(slot);
        *slot = updated.clone();
        self.write_users_file(&file).await?;
        Ok(updated)
    }

    /// Remove a user. The id is never handed out again.
    pub async fn delete_user(&self, id: u64) -> Result<(), StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut file = self.read_users_file().await?;

        let before = file.users.len();
        file.users.retain(|u| u.id != id);
        if file.users.len() == before {
            return Err(StoreError::UserNotFound(id));
        }

        self.write_users_file(&file).await
    }

    /// Clear every `matchedWith`, preserving all other fields including
    /// ready status and preferences.
    pub async fn reset_matches(&self) -> Result<Vec<User>, StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut file = self.read_users_file().await?;

        file.users = file
            .users
            .iter()
            .map(|u| u.with_matched_with(None))
            .collect();

        self.write_users_file(&file).await?;
        Ok(file.users)
    }

    // ─── Settings Operations ─────────────────────────────────────

    /// Load exchange settings, falling back to defaults if the file is
    /// missing.
    pub async fn get_settings(&self) -> Result<ExchangeSettings, StoreError> {
        match tokio::fs::read_to_string(&self.inner.settings_path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(ExchangeSettings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist exchange settings.
    pub async fn update_settings(
        &self,
        settings: &ExchangeSettings,
    ) -> Result<(), StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        self.write_settings(settings).await
    }

    // ─── File Plumbing ───────────────────────────────────────────

    async fn read_users_file(&self) -> Result<UsersFile, StoreError> {
        match tokio::fs::read_to_string(&self.inner.users_path).await {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UsersFile {
                users: Vec::new(),
                next_id: 0,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_users_file(&self, file: &UsersFile) -> Result<(), StoreError> {
        write_atomic(&self.inner.users_path, &serde_json::to_vec_pretty(file)?).await
    }

    async fn write_settings(&self, settings: &ExchangeSettings) -> Result<(), StoreError> {
        write_atomic(
            &self.inner.settings_path,
            &serde_json::to_vec_pretty(settings)?,
        )
        .await
    }
}

impl UsersFile {
    /// Hand out the next id. `nextId == 0` means a legacy file without the
    /// counter; bootstrap it past the highest existing id.
    fn allocate_id(&mut self) -> u64 {
        if self.next_id == 0 {
            self.next_id = self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Write via temp file + rename so readers never see a torn document.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, UserStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UserStore::open(dir.path());
        (dir, store)
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: Some(format!("{}@example.com", name)),
            password_hash: "$argon2id$stub".to_string(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_initialize_seeds_admin_once() {
        let (_dir, store) = temp_store();

        store.initialize("$argon2id$hash").await.unwrap();
        store.initialize("$argon2id$hash").await.unwrap();

        let users = store.get_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "admin");
        assert!(users[0].is_admin);
        assert!(!users[0].ready);

        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings.price_range, "25-50");
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let (_dir, store) = temp_store();
        store.initialize("hash").await.unwrap();

        let alice = store.add_user(new_user("alice")).await.unwrap();
        let bob = store.add_user(new_user("bob")).await.unwrap();
        assert_ne!(alice.id, bob.id);

        store.delete_user(bob.id).await.unwrap();
        let carol = store.add_user(new_user("carol")).await.unwrap();

        assert!(carol.id > bob.id, "deleted id must not be handed out again");
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields_verbatim() {
        let (_dir, store) = temp_store();
        store.initialize("hash").await.unwrap();

        let mut users = store.get_users().await.unwrap();
        users.push(User {
            id: 42,
            username: "dave".to_string(),
            email: None,
            password_hash: "$argon2id$other".to_string(),
            is_admin: false,
            ready: true,
            matched_with: Some(7),
            gift_preferences: GiftPreferences {
                likes: vec!["vinyl".to_string(), "coffee".to_string()],
                dislikes: vec!["mugs".to_string(), "gift cards".to_string()],
            },
            created_at: "2025-11-15T12:00:00Z".to_string(),
        });

        store.save_users(&users).await.unwrap();
        let reloaded = store.get_users().await.unwrap();

        assert_eq!(reloaded, users);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (_dir, store) = temp_store();
        store.initialize("hash").await.unwrap();

        store.add_user(new_user("alice")).await.unwrap();
        let err = store.add_user(new_user("alice")).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn test_reset_matches_only_clears_matched_with() {
        let (_dir, store) = temp_store();
        store.initialize("hash").await.unwrap();

        let alice = store.add_user(new_user("alice")).await.unwrap();
        store
            .update_user(alice.id, |u| {
                let mut u = u.with_matched_with(Some(99));
                u.ready = true;
                u.gift_preferences.likes = vec!["plants".to_string()];
                u
            })
            .await
            .unwrap();

        store.reset_matches().await.unwrap();

        let reloaded = store.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(reloaded.matched_with, None);
        assert!(reloaded.ready);
        assert_eq!(reloaded.gift_preferences.likes, vec!["plants".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_settings_writes_never_tear() {
        let (_dir, store) = temp_store();
        store.initialize("hash").await.unwrap();

        // Unordered writers sharing one temp path could publish a
        // half-written config.json; the write lock must serialize them
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_settings(&ExchangeSettings {
                        price_range: format!("{}-{}", i * 10, i * 10 + 5),
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // The file must parse and hold exactly one of the written values
        let settings = store.get_settings().await.unwrap();
        let (low, rest) = settings.price_range.split_once('-').unwrap();
        let low: u64 = low.parse().unwrap();
        let high: u64 = rest.parse().unwrap();
        assert!(low % 10 == 0 && low < 160);
        assert_eq!(high, low + 5);
    }

    #[tokio::test]
    async fn test_update_missing_user_fails() {
        let (_dir, store) = temp_store();
        store.initialize("hash").await.unwrap();

        let err = store.update_user(12345, |u| u.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(12345)));
    }
}
