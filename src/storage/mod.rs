//! Persistence layer.
//!
//! A small key-value abstraction (`KvStore`) with memory, JSON-file and
//! SQLite backends, and the typed `AccountRepository` the account
//! service talks to. Three independent collections live under fixed
//! keys: user profiles, the active session's user id, and a
//! user-id-indexed map of wallet transactions. Every write replaces the
//! whole value (last write wins), so the repository serialises its
//! read-modify-write cycles.

pub mod json_file;
pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::types::{Transaction, User};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

const USERS_KEY: &str = "betbot_users";
const SESSION_KEY: &str = "betbot_session";
const TRANSACTIONS_KEY: &str = "betbot_transactions";

// ---------------------------------------------------------------------------
// Key-value store
// ---------------------------------------------------------------------------

/// String-valued key-value storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Open the backend named in the config.
pub async fn open_store(cfg: &StorageConfig) -> Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match cfg.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        "json" => Arc::new(JsonFileStore::open(&cfg.path)?),
        "sqlite" => Arc::new(SqliteStore::connect(&cfg.path).await?),
        other => anyhow::bail!("Unknown storage backend: {other}"),
    };
    info!(backend = %cfg.backend, path = %cfg.path, "Storage opened");
    Ok(store)
}

// ---------------------------------------------------------------------------
// Account repository
// ---------------------------------------------------------------------------

/// CRUD access to user profiles, the active session and wallet history.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn users(&self) -> Result<Vec<User>>;
    /// Store a new profile unless its email is already registered.
    /// Returns false for a duplicate, leaving storage untouched.
    async fn insert_user(&self, user: &User) -> Result<bool>;
    /// Apply `change` to the stored profile with this id and return the
    /// result. `None` if no such user exists.
    async fn modify_user(
        &self,
        user_id: &str,
        change: &(dyn for<'u> Fn(&'u mut User) + Send + Sync),
    ) -> Result<Option<User>>;

    async fn session_user_id(&self) -> Result<Option<String>>;
    async fn set_session(&self, user_id: &str) -> Result<()>;
    async fn clear_session(&self) -> Result<()>;

    /// Transactions for a user, newest first.
    async fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;
    async fn add_transaction(&self, user_id: &str, tx: &Transaction) -> Result<()>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users().await?.into_iter().find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users().await?.into_iter().find(|u| u.id == id))
    }

    /// The profile of the active session, if any.
    async fn session_user(&self) -> Result<Option<User>> {
        match self.session_user_id().await? {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }
}

/// `AccountRepository` over any `KvStore`, storing each collection as a
/// JSON document under its own key.
pub struct KvAccountRepository {
    store: Arc<dyn KvStore>,
    /// Held across every load-mutate-save of a collection.
    writes: Mutex<()>,
}

impl KvAccountRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.store.get(key).await? {
            Some(json) => serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse stored value for {key}")),
            None => Ok(T::default()),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialise value for {key}"))?;
        self.store.put(key, &json).await?;
        debug!(key, bytes = json.len(), "Saved");
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for KvAccountRepository {
    async fn users(&self) -> Result<Vec<User>> {
        self.load(USERS_KEY).await
    }

    async fn insert_user(&self, user: &User) -> Result<bool> {
        let _guard = self.writes.lock().await;
        let mut users: Vec<User> = self.load(USERS_KEY).await?;
        if users.iter().any(|u| u.email == user.email) {
            return Ok(false);
        }
        users.push(user.clone());
        self.save(USERS_KEY, &users).await?;
        Ok(true)
    }

    async fn modify_user(
        &self,
        user_id: &str,
        change: &(dyn for<'u> Fn(&'u mut User) + Send + Sync),
    ) -> Result<Option<User>> {
        let _guard = self.writes.lock().await;
        let mut users: Vec<User> = self.load(USERS_KEY).await?;
        let Some(slot) = users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        change(slot);
        let updated = slot.clone();
        self.save(USERS_KEY, &users).await?;
        Ok(Some(updated))
    }

    async fn session_user_id(&self) -> Result<Option<String>> {
        self.load(SESSION_KEY).await
    }

    async fn set_session(&self, user_id: &str) -> Result<()> {
        self.save(SESSION_KEY, &user_id).await
    }

    async fn clear_session(&self) -> Result<()> {
        self.store.remove(SESSION_KEY).await
    }

    async fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let mut all: HashMap<String, Vec<Transaction>> = self.load(TRANSACTIONS_KEY).await?;
        Ok(all.remove(user_id).unwrap_or_default())
    }

    async fn add_transaction(&self, user_id: &str, tx: &Transaction) -> Result<()> {
        let _guard = self.writes.lock().await;
        let mut all: HashMap<String, Vec<Transaction>> = self.load(TRANSACTIONS_KEY).await?;
        all.entry(user_id.to_string()).or_default().insert(0, tx.clone());
        self.save(TRANSACTIONS_KEY, &all).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
