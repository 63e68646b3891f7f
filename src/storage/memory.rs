//! In-process registration store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{BuildingId, ChatRegistration};
use crate::storage::ChatStore;

/// Volatile store living as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chats: RwLock<Vec<ChatRegistration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.chats.read().await.len()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find(&self, chat_id: &str, env: &str) -> Result<Option<ChatRegistration>> {
        let chats = self.chats.read().await;
        Ok(chats
            .iter()
            .find(|c| c.chat_id == chat_id && c.env == env)
            .cloned())
    }

    async fn insert(&self, chat: ChatRegistration) -> Result<ChatRegistration> {
        let mut chats = self.chats.write().await;
        if let Some(existing) = chats
            .iter()
            .find(|c| c.chat_id == chat.chat_id && c.env == chat.env)
        {
            return Ok(existing.clone());
        }
        chats.push(chat.clone());
        Ok(chat)
    }

    async fn list_by_buildings(
        &self,
        building_ids: &[BuildingId],
        env: &str,
    ) -> Result<Vec<ChatRegistration>> {
        let chats = self.chats.read().await;
        Ok(chats
            .iter()
            .filter(|c| c.env == env && building_ids.contains(&c.building_id))
            .cloned()
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chat(id: &str, chat_id: &str, building_id: BuildingId, env: &str) -> ChatRegistration {
        ChatRegistration {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            building_id,
            floor_number: 1,
            env: env.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_per_env() {
        let store = MemoryStore::new();
        let first = store.insert(chat("a", "111", 1, "dev")).await.unwrap();
        let again = store.insert(chat("b", "111", 2, "dev")).await.unwrap();

        assert_eq!(again, first);
        assert_eq!(store.len().await, 1);

        store.insert(chat("c", "111", 1, "prod")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_list_filters_buildings_and_env() {
        let store = MemoryStore::new();
        store.insert(chat("a", "1", 1, "dev")).await.unwrap();
        store.insert(chat("b", "2", 2, "dev")).await.unwrap();
        store.insert(chat("c", "3", 1, "prod")).await.unwrap();

        let found = store.list_by_buildings(&[1, 3], "dev").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].chat_id, "1");

        assert!(store.find("3", "dev").await.unwrap().is_none());
        assert!(store.find("3", "prod").await.unwrap().is_some());
    }
}
