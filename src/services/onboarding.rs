// src/services/onboarding.rs

//! Chat onboarding: invite link → joined group → registration.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{BuildingId, ChatRegistration, is_valid_building_id};
use crate::services::gateway::MessagingGateway;
use crate::services::registry::ChatRegistry;
use crate::utils::url::parse_invite_link;

/// Service adding a floor chat to the registry.
pub struct ChatOnboarding {
    registry: Arc<ChatRegistry>,
    gateway: Arc<dyn MessagingGateway>,
}

impl ChatOnboarding {
    pub fn new(registry: Arc<ChatRegistry>, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { registry, gateway }
    }

    /// Join the chat behind `invite_link` and register it.
    ///
    /// Input and duplicate checks happen before any gateway call. The
    /// existence check and the insert are separate calls, so two concurrent
    /// onboardings of one chat can both pass the check; the store then keeps
    /// the first record.
    pub async fn onboard(
        &self,
        invite_link: &str,
        building_id: i64,
        floor_number: i64,
    ) -> Result<ChatRegistration> {
        let link = parse_invite_link(invite_link)
            .ok_or_else(|| AppError::validation("Invalid GroupMe link"))?;

        if !is_valid_building_id(building_id) {
            return Err(AppError::validation(format!(
                "Invalid building_id: {building_id}"
            )));
        }
        let floor_number = u32::try_from(floor_number)
            .ok()
            .filter(|floor| *floor >= 1)
            .ok_or_else(|| {
                AppError::validation(format!("Invalid floor_number: {floor_number}"))
            })?;

        if self.registry.exists(&link.group_id).await? {
            return Err(AppError::conflict("Chat already exists"));
        }

        if let Err(e) = self
            .gateway
            .join_group(&link.group_id, &link.share_token)
            .await
        {
            log::error!("Failed to join group {}: {}", link.group_id, e);
            return Err(AppError::upstream("Failed to join the GroupMe group"));
        }

        self.registry
            .register(&link.group_id, building_id as BuildingId, floor_number)
            .await
            .map_err(|e| {
                log::error!("Failed to register chat {}: {}", link.group_id, e);
                AppError::upstream("Failed to add chat")
            })
    }
}
