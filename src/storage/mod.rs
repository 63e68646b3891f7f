//! Storage abstractions for chat registrations.
//!
//! Two backends implement [`ChatStore`]:
//! - [`SqliteStore`]: durable, one table keyed by `(groupme_id, env)`
//! - [`MemoryStore`]: process-lifetime fallback when the durable store is
//!   unavailable
//!
//! The durable store is reached through a [`StoreConnector`] so the registry
//! can open it lazily and exactly once.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BuildingId, ChatRegistration};

// Re-export for convenience
pub use memory::MemoryStore;
pub use sqlite::{SqliteConnector, SqliteStore};

/// Trait for chat registration backends.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Look up the registration for a chat within an environment.
    async fn find(&self, chat_id: &str, env: &str) -> Result<Option<ChatRegistration>>;

    /// Insert a registration.
    ///
    /// If `(chat_id, env)` is already registered, the stored record is
    /// returned unchanged and nothing is written.
    async fn insert(&self, chat: ChatRegistration) -> Result<ChatRegistration>;

    /// All registrations in an environment whose building is in `building_ids`.
    async fn list_by_buildings(
        &self,
        building_ids: &[BuildingId],
        env: &str,
    ) -> Result<Vec<ChatRegistration>>;

    /// Short backend name for logs and reports.
    fn backend(&self) -> &'static str;
}

/// Opens a durable [`ChatStore`].
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ChatStore>>;

    /// Where this connector points, for logs.
    fn describe(&self) -> String;
}
