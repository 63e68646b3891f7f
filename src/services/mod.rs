//! Service layer for RHACbot.
//!
//! This module contains the business logic for:
//! - Chat registration storage (`ChatRegistry`)
//! - Target selection (`SelectionTree`, `expand_targets`)
//! - Message delivery (`Broadcaster`) over a `MessagingGateway`
//! - Adding chats from invite links (`ChatOnboarding`)

pub mod broadcast;
pub mod gateway;
pub mod onboarding;
pub mod registry;
pub mod selection;

pub use broadcast::{BroadcastRequest, Broadcaster, ImageUpload, MAX_MESSAGE_CHARS};
pub use gateway::{GroupMeClient, MessagingGateway};
pub use onboarding::ChatOnboarding;
pub use registry::ChatRegistry;
pub use selection::{CanonicalSelection, SelectionTree, expand_targets};
