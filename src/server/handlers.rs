// src/server/handlers.rs

//! JSON API handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{DeliveryOutcome, SelectionNode};
use crate::server::AppState;
use crate::services::{BroadcastRequest, ImageUpload};

const DEFAULT_IMAGE_TYPE: &str = "application/octet-stream";

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

/// Accept an integer given as a JSON number or a numeric string.
fn int_field(value: &Value, name: &str) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::validation(format!("Invalid {name}: {value}")))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Backend is healthy",
        "env": state.registry.env(),
        "storage": state.registry.backend().await,
    }))
}

pub async fn list_buildings(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "buildings": state.directory.all() }))
}

pub async fn selection_tree(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tree": [state.tree.root()] }))
}

#[derive(Debug, Deserialize)]
pub struct CanonicalizeRequest {
    #[serde(default)]
    selection: Vec<Value>,
}

pub async fn canonicalize(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CanonicalizeRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = json_body(payload)?;
    let raw = SelectionNode::from_json_list(&request.selection)?;
    let canonical = state.tree.canonicalize(&raw);

    Ok(Json(json!({
        "selection": canonical.labeled(&state.directory),
        "targets": canonical.to_targets(&state.tree),
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddChatRequest {
    groupme_link: Option<String>,
    building_id: Option<Value>,
    floor_number: Option<Value>,
}

pub async fn add_chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddChatRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = json_body(payload)?;
    let (Some(link), Some(building_id), Some(floor_number)) = (
        request.groupme_link.filter(|l| !l.trim().is_empty()),
        request.building_id.filter(|v| !v.is_null()),
        request.floor_number.filter(|v| !v.is_null()),
    ) else {
        return Err(AppError::validation(
            "Missing groupme_link, building_id, or floor_number",
        ));
    };

    let building_id = int_field(&building_id, "building_id")?;
    let floor_number = int_field(&floor_number, "floor_number")?;
    let chat = state
        .onboarding
        .onboard(&link, building_id, floor_number)
        .await?;

    Ok(Json(json!({
        "message": "Chat added successfully",
        "chat_id": chat.id,
        "chat": chat,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    password: Option<String>,
}

pub async fn authenticate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let password = json_body(payload)?
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Missing password"))?;

    if !state.auth.verify(&password) {
        log::warn!("Rejected admin authentication attempt");
        return Err(AppError::Unauthorized);
    }
    Ok(Json(json!({ "message": "Authenticated" })))
}

/// Fields of the send-message form.
#[derive(Debug, Default)]
struct SendForm {
    password: Option<String>,
    message_body: String,
    image: Option<ImageUpload>,
    regions: Vec<String>,
    building_ids: Vec<String>,
}

async fn read_send_form(mut multipart: Multipart) -> Result<SendForm> {
    let mut form = SendForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image_file" => {
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_IMAGE_TYPE)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        content_type,
                    });
                }
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                match name.as_str() {
                    "password" | "auth" if form.password.is_none() && !text.is_empty() => {
                        form.password = Some(text);
                    }
                    "message_body" => form.message_body = text,
                    "regions" if !text.trim().is_empty() => form.regions.push(text),
                    "building_ids" if !text.trim().is_empty() => form.building_ids.push(text),
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

pub async fn send_message(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let form = read_send_form(multipart).await?;

    let authorized = form
        .password
        .as_deref()
        .is_some_and(|p| state.auth.verify(p));
    if !authorized {
        log::warn!("Unauthorized send_messages attempt");
        return Err(AppError::Unauthorized);
    }

    let building_ids = form
        .building_ids
        .iter()
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| AppError::validation(format!("Invalid building_id: {raw}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let summary = state
        .broadcaster
        .broadcast(BroadcastRequest {
            message_body: form.message_body,
            image: form.image,
            regions: form.regions,
            building_ids,
        })
        .await?;

    let counts = json!({
        "total": summary.total,
        "sent": summary.sent,
        "failed": summary.failed,
    });
    let response = match summary.outcome() {
        DeliveryOutcome::Delivered => (
            StatusCode::OK,
            Json(json!({
                "message": "All messages sent successfully",
                "summary": counts,
            })),
        ),
        _ => (
            StatusCode::MULTI_STATUS,
            Json(json!({
                "message": "Some messages were sent successfully",
                "summary": counts,
                "failures": summary.failures,
            })),
        ),
    };
    Ok(response.into_response())
}
