// src/services/registry.rs

//! Chat registry service.
//!
//! Owns every chat registration for one environment tag. Reads and writes go
//! to the durable store when it can be opened, otherwise to a process-local
//! [`MemoryStore`]. The durable connection is opened lazily, at most once.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BuildingId, ChatDestination, ChatRegistration, Config};
use crate::storage::{ChatStore, MemoryStore, SqliteConnector, StoreConnector};

/// Registry of floor chats, scoped to one environment tag.
pub struct ChatRegistry {
    env: String,
    connector: Option<Arc<dyn StoreConnector>>,
    durable: OnceCell<Arc<dyn ChatStore>>,
    fallback: Arc<MemoryStore>,
}

impl ChatRegistry {
    /// Registry with a durable store behind `connector`.
    pub fn new(env: impl Into<String>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            env: env.into(),
            connector: Some(connector),
            durable: OnceCell::new(),
            fallback: Arc::new(MemoryStore::new()),
        }
    }

    /// Registry that only ever uses the in-memory store.
    pub fn in_memory(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            connector: None,
            durable: OnceCell::new(),
            fallback: Arc::new(MemoryStore::new()),
        }
    }

    /// Registry for the configured environment and database path.
    pub fn from_config(config: &Config) -> Self {
        match config.database_path() {
            Some(path) => Self::new(config.env.clone(), Arc::new(SqliteConnector::new(path))),
            None => {
                log::warn!("DATABASE_DIR not set; chats are kept in memory only");
                Self::in_memory(config.env.clone())
            }
        }
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// The store serving this call.
    ///
    /// A failed connection attempt is not cached; the next call tries again.
    async fn store(&self) -> Arc<dyn ChatStore> {
        let Some(connector) = &self.connector else {
            return self.fallback.clone() as Arc<dyn ChatStore>;
        };

        match self.durable.get_or_try_init(|| connector.connect()).await {
            Ok(store) => Arc::clone(store),
            Err(e) => {
                log::warn!(
                    "Chat registry {} unavailable ({}); using in-memory store",
                    connector.describe(),
                    e
                );
                self.fallback.clone() as Arc<dyn ChatStore>
            }
        }
    }

    /// Name of the backend the next call would use.
    pub async fn backend(&self) -> &'static str {
        self.store().await.backend()
    }

    /// Whether a chat is registered in this environment.
    pub async fn exists(&self, chat_id: &str) -> Result<bool> {
        let store = self.store().await;
        Ok(store.find(chat_id, &self.env).await?.is_some())
    }

    /// Register a chat.
    ///
    /// Registering a chat id that already exists in this environment returns
    /// the stored record instead of creating a second one.
    pub async fn register(
        &self,
        chat_id: &str,
        building_id: BuildingId,
        floor_number: u32,
    ) -> Result<ChatRegistration> {
        let chat = ChatRegistration {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            building_id,
            floor_number,
            env: self.env.clone(),
            created_at: Utc::now(),
        };

        let store = self.store().await;
        let saved = store.insert(chat).await?;
        log::info!(
            "Registered chat {} (building {}, floor {}) in {} [{}]",
            saved.chat_id,
            saved.building_id,
            saved.floor_number,
            self.env,
            store.backend()
        );
        Ok(saved)
    }

    /// Destinations per requested building.
    ///
    /// Every requested id is a key, with an empty list when nothing is
    /// registered there. Destinations are ordered by floor, then chat id.
    pub async fn list_by_buildings(
        &self,
        building_ids: &[BuildingId],
    ) -> Result<BTreeMap<BuildingId, Vec<ChatDestination>>> {
        let mut grouped: BTreeMap<BuildingId, Vec<ChatDestination>> = building_ids
            .iter()
            .map(|id| (*id, Vec::new()))
            .collect();

        let store = self.store().await;
        for chat in store.list_by_buildings(building_ids, &self.env).await? {
            if let Some(destinations) = grouped.get_mut(&chat.building_id) {
                destinations.push(ChatDestination::from(&chat));
            }
        }

        for destinations in grouped.values_mut() {
            destinations.sort_by(|a, b| {
                (a.floor_number, &a.chat_id).cmp(&(b.floor_number, &b.chat_id))
            });
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::storage::SqliteStore;

    /// Connector that always fails, counting attempts.
    #[derive(Default)]
    struct BrokenConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl StoreConnector for BrokenConnector {
        async fn connect(&self) -> Result<Arc<dyn ChatStore>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::config("no database configured"))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    /// Connector over an in-memory SQLite database, counting connections.
    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl StoreConnector for CountingConnector {
        async fn connect(&self) -> Result<Arc<dyn ChatStore>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(Arc::new(SqliteStore::open_in_memory()?))
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[tokio::test]
    async fn test_register_then_exists() {
        let registry = ChatRegistry::in_memory("test");
        assert!(!registry.exists("12345678").await.unwrap());

        let chat = registry.register("12345678", 3, 2).await.unwrap();
        assert_eq!(chat.env, "test");
        assert!(!chat.id.is_empty());
        assert!(registry.exists("12345678").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_register_returns_existing_record() {
        let registry = ChatRegistry::in_memory("test");
        let first = registry.register("42", 1, 1).await.unwrap();
        let second = registry.register("42", 5, 7).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_by_buildings_includes_empty_keys() {
        let registry = ChatRegistry::in_memory("test");
        registry.register("b", 1, 2).await.unwrap();
        registry.register("a", 1, 1).await.unwrap();
        registry.register("c", 9, 1).await.unwrap();

        let grouped = registry.list_by_buildings(&[1, 2]).await.unwrap();
        assert_eq!(grouped.len(), 2);
        let floors: Vec<_> = grouped[&1].iter().map(|d| d.floor_number).collect();
        assert_eq!(floors, vec![1, 2]);
        assert!(grouped[&2].is_empty());
    }

    #[tokio::test]
    async fn test_environments_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let connector: Arc<dyn StoreConnector> =
            Arc::new(SqliteConnector::new(tmp.path().join("rhac.sqlite3")));
        let dev = ChatRegistry::new("dev", Arc::clone(&connector));
        let prod = ChatRegistry::new("prod", connector);

        dev.register("777", 4, 1).await.unwrap();
        assert!(dev.exists("777").await.unwrap());
        assert!(!prod.exists("777").await.unwrap());
        assert!(prod.list_by_buildings(&[4]).await.unwrap()[&4].is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_memory_when_store_unavailable() {
        let connector = Arc::new(BrokenConnector::default());
        let registry = ChatRegistry::new("test", connector.clone());

        registry.register("1", 1, 1).await.unwrap();
        assert!(registry.exists("1").await.unwrap());
        assert_eq!(registry.backend().await, "memory");
        assert!(connector.attempts.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_from_config_without_database_uses_memory() {
        let registry = ChatRegistry::from_config(&Config::default());
        assert_eq!(registry.env(), "dev");
        assert_eq!(registry.backend().await, "memory");
    }

    #[tokio::test]
    async fn test_concurrent_calls_connect_once() {
        let connector = Arc::new(CountingConnector::default());
        let registry = Arc::new(ChatRegistry::new("test", connector.clone()));

        let calls = (0..8).map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.register(&i.to_string(), 1, 1).await })
        });
        for call in futures::future::join_all(calls).await {
            call.unwrap().unwrap();
        }

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(registry.backend().await, "sqlite");
        assert_eq!(registry.list_by_buildings(&[1]).await.unwrap()[&1].len(), 8);
    }
}
