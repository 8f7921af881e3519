use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use wall_db::models::MessageRow;
use wall_types::api::{CreateMessageRequest, MessageResponse};

use crate::error::ApiError;
use crate::middleware::Identity;
use crate::{AppState, blocking, validation};

/// The whole wall, newest first. Open to anonymous callers.
pub async fn list_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = blocking(move || Ok(db.db.list_messages()?)).await?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(to_response).collect();
    Ok(Json(messages))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // Authorization comes before looking at the body
    let user = identity.require_user()?;
    let Json(req) = body?;

    let content = validation::required_text(req.content.as_deref())
        .map_err(|msg| ApiError::field("content", msg))?;

    let db = state.clone();
    let user_id = user.id;
    let row = blocking(move || Ok(db.db.insert_message(user_id, &content, Utc::now())?)).await?;

    info!(message_id = row.id, user_id, "Message posted");
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

fn to_response(row: MessageRow) -> MessageResponse {
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message {}: {}", row.created_at, row.id, e);
            DateTime::default()
        });

    MessageResponse {
        id: row.id,
        user: row.username,
        content: row.content,
        created_at,
    }
}
