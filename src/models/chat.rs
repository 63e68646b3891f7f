//! Registered floor chats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BuildingId;

/// A floor chat registered for broadcasts.
///
/// Unique per `(chat_id, env)`; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRegistration {
    /// Opaque handle assigned by the registry
    pub id: String,

    /// GroupMe group id of the destination chat
    pub chat_id: String,

    pub building_id: BuildingId,

    /// Floor number, 1 or higher
    pub floor_number: u32,

    /// Environment tag the chat was registered under
    pub env: String,

    pub created_at: DateTime<Utc>,
}

/// A chat resolved for delivery within one building.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatDestination {
    pub chat_id: String,
    pub floor_number: u32,
}

impl From<&ChatRegistration> for ChatDestination {
    fn from(chat: &ChatRegistration) -> Self {
        Self {
            chat_id: chat.chat_id.clone(),
            floor_number: chat.floor_number,
        }
    }
}
