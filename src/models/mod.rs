// src/models/mod.rs

//! Domain models for RHACbot.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod building;
mod chat;
mod config;
mod delivery;
mod selection;

// Re-export all public types
pub use building::{
    Building, BuildingDirectory, BuildingId, MAX_BUILDING_ID, Region, is_valid_building_id,
};
pub use chat::{ChatDestination, ChatRegistration};
pub use config::{
    AuthConfig, BroadcastConfig, Config, DatabaseConfig, GroupMeConfig, LoggingConfig,
    PathsConfig, ServerConfig,
};
pub use delivery::{DeliveryFailure, DeliveryOutcome, DeliverySummary};
pub use selection::{BroadcastTargets, LabeledValue, SelectionNode, TreeNode};

#[cfg(test)]
pub(crate) use building::tests::sample_directory;
