// src/services/broadcast.rs

//! Broadcast orchestrator.
//!
//! Validates a message, resolves its targets to floor chats, uploads the
//! optional image once, then delivers to every chat through a bounded
//! concurrent stream and folds the results into a [`DeliverySummary`].

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{
    BroadcastConfig, BuildingDirectory, BuildingId, DeliveryFailure, DeliverySummary,
};
use crate::services::gateway::MessagingGateway;
use crate::services::registry::ChatRegistry;
use crate::services::selection::expand_targets;

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Image attached to a broadcast.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// One broadcast request. Exactly one of `regions` and `building_ids` is
/// expected to be non-empty.
#[derive(Debug, Clone, Default)]
pub struct BroadcastRequest {
    pub message_body: String,
    pub image: Option<ImageUpload>,
    pub regions: Vec<String>,
    pub building_ids: Vec<i64>,
}

/// A resolved delivery destination.
#[derive(Debug, Clone)]
struct Delivery {
    building_id: BuildingId,
    building: String,
    floor: u32,
    chat_id: String,
}

/// Service fanning a message out to floor chats.
pub struct Broadcaster {
    directory: Arc<BuildingDirectory>,
    registry: Arc<ChatRegistry>,
    gateway: Arc<dyn MessagingGateway>,
    max_concurrent: usize,
    call_timeout: Duration,
}

impl Broadcaster {
    pub fn new(
        directory: Arc<BuildingDirectory>,
        registry: Arc<ChatRegistry>,
        gateway: Arc<dyn MessagingGateway>,
        config: &BroadcastConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            registry,
            gateway,
            max_concurrent: config.max_concurrent.max(1),
            call_timeout,
        }
    }

    /// Reject empty or overlong message bodies.
    pub fn validate_message(&self, body: &str) -> Result<()> {
        if body.trim().is_empty() {
            return Err(AppError::validation("Message body is required"));
        }
        let length = body.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "Message body must be {MAX_MESSAGE_CHARS} characters or fewer (got {length})"
            )));
        }
        Ok(())
    }

    /// Deliver a message to every chat the request targets.
    ///
    /// Per-chat failures are collected in the summary. The call itself fails
    /// when input is invalid, when nothing is registered for the targets,
    /// when the image upload fails, or when every delivery fails.
    pub async fn broadcast(&self, request: BroadcastRequest) -> Result<DeliverySummary> {
        self.validate_message(&request.message_body)?;

        match (request.regions.is_empty(), request.building_ids.is_empty()) {
            (true, true) => {
                return Err(AppError::validation("Missing building_ids or regions"));
            }
            (false, false) => {
                return Err(AppError::validation(
                    "Provide either building_ids or regions, not both",
                ));
            }
            _ => {}
        }

        let building_ids =
            expand_targets(&self.directory, &request.regions, &request.building_ids)?;
        let deliveries = self.resolve(&building_ids).await?;
        if deliveries.is_empty() {
            return Err(AppError::not_found(
                "No group chats found for the provided building IDs",
            ));
        }

        let image_url = match request.image {
            Some(image) => Some(self.upload(image).await?),
            None => None,
        };

        log::info!(
            "Broadcasting to {} chats across {} buildings",
            deliveries.len(),
            building_ids.len()
        );
        let summary = self
            .fan_out(deliveries, &request.message_body, image_url.as_deref())
            .await;
        log::info!(
            "Broadcast finished: {} sent, {} failed",
            summary.sent,
            summary.failed
        );

        if summary.sent == 0 {
            return Err(AppError::Undelivered {
                attempts: summary.total,
            });
        }
        Ok(summary)
    }

    async fn resolve(&self, building_ids: &[BuildingId]) -> Result<Vec<Delivery>> {
        let grouped = self.registry.list_by_buildings(building_ids).await?;
        Ok(grouped
            .into_iter()
            .flat_map(|(building_id, destinations)| {
                let building = self.directory.name_of(building_id).to_string();
                destinations.into_iter().map(move |d| Delivery {
                    building_id,
                    building: building.clone(),
                    floor: d.floor_number,
                    chat_id: d.chat_id,
                })
            })
            .collect())
    }

    async fn upload(&self, image: ImageUpload) -> Result<String> {
        let upload = self.gateway.upload_image(image.bytes, &image.content_type);
        match tokio::time::timeout(self.call_timeout, upload).await {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(e)) => Err(AppError::upstream(format!(
                "Failed to upload image: {}",
                e.detail()
            ))),
            Err(_) => Err(AppError::upstream(format!(
                "Failed to upload image: timed out after {}s",
                self.call_timeout.as_secs()
            ))),
        }
    }

    async fn fan_out(
        &self,
        deliveries: Vec<Delivery>,
        text: &str,
        image_url: Option<&str>,
    ) -> DeliverySummary {
        let mut results = stream::iter(deliveries)
            .map(|delivery| async move {
                let result = self.deliver(&delivery.chat_id, text, image_url).await;
                (delivery, result)
            })
            .buffer_unordered(self.max_concurrent);

        let mut summary = DeliverySummary::default();
        while let Some((delivery, result)) = results.next().await {
            match result {
                Ok(_) => summary.record_sent(),
                Err(error) => {
                    log::warn!(
                        "Delivery to chat {} ({} floor {}) failed: {}",
                        delivery.chat_id,
                        delivery.building,
                        delivery.floor,
                        error
                    );
                    summary.record_failure(DeliveryFailure {
                        chat_id: delivery.chat_id,
                        building_id: delivery.building_id,
                        building: delivery.building,
                        floor: delivery.floor,
                        error: error.detail(),
                        status_code: error.status_code(),
                    });
                }
            }
        }

        summary.sort_failures();
        summary
    }

    async fn deliver(&self, chat_id: &str, text: &str, image_url: Option<&str>) -> Result<u16> {
        let send = self.gateway.send_message(chat_id, text, image_url);
        match tokio::time::timeout(self.call_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(AppError::gateway(
                None,
                format!("timed out after {}s", self.call_timeout.as_secs()),
            )),
        }
    }
}
