// src/services/gateway.rs

//! Messaging gateway.
//!
//! The core only sees [`MessagingGateway`]; [`GroupMeClient`] implements it
//! against the GroupMe v3 REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::GroupMeConfig;
use crate::utils::http::create_async_client;

/// External chat provider operations used by onboarding and broadcast.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Join a group using its share token.
    async fn join_group(&self, group_id: &str, share_token: &str) -> Result<()>;

    /// Upload an image and return its hosted URL.
    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Post a message to a group, returning the upstream status code.
    async fn send_message(&self, chat_id: &str, text: &str, image_url: Option<&str>)
    -> Result<u16>;
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    payload: ImagePayload,
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    picture_url: String,
}

/// GroupMe API client.
#[derive(Clone)]
pub struct GroupMeClient {
    client: Client,
    api_url: String,
    image_url: String,
    access_token: String,
}

impl GroupMeClient {
    /// Create a client from the GroupMe configuration.
    pub fn new(config: &GroupMeConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            image_url: config.image_url.clone(),
            access_token: config.access_token.trim().to_string(),
        })
    }

    fn token(&self) -> Result<&str> {
        if self.access_token.is_empty() {
            return Err(AppError::gateway(None, "GROUPME_ACCESS_TOKEN is not set"));
        }
        Ok(&self.access_token)
    }

    async fn failure(response: reqwest::Response) -> AppError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AppError::gateway(Some(status), body)
    }
}

#[async_trait]
impl MessagingGateway for GroupMeClient {
    async fn join_group(&self, group_id: &str, share_token: &str) -> Result<()> {
        let token = self.token()?;
        let url = format!("{}/groups/{}/join/{}", self.api_url, group_id, share_token);

        let response = self
            .client
            .post(&url)
            .query(&[("token", token)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                log::info!("Joined group {group_id}");
                Ok(())
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let token = self.token()?;

        let response = self
            .client
            .post(&self.image_url)
            .header("X-Access-Token", token)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let parsed: ImageResponse = response.json().await?;
        log::debug!("Uploaded image to {}", parsed.payload.picture_url);
        Ok(parsed.payload.picture_url)
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<u16> {
        let token = self.token()?;
        let url = format!("{}/groups/{}/messages", self.api_url, chat_id);

        let attachments: Vec<_> = image_url
            .map(|url| json!({ "type": "image", "url": url }))
            .into_iter()
            .collect();
        let body = json!({
            "message": {
                "source_guid": Uuid::new_v4().to_string(),
                "text": text,
                "attachments": attachments,
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("token", token)])
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CREATED {
            Ok(StatusCode::CREATED.as_u16())
        } else {
            Err(Self::failure(response).await)
        }
    }
}
