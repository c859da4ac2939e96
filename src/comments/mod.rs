use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::email::Notification;
use crate::shared::error::ApiError;
use crate::shared::models::{Comment, CommentView, Role, Ticket, UserSummary};
use crate::shared::state::AppState;
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub ticket_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub ticket_id: Uuid,
    pub message: String,
    pub is_internal: Option<bool>,
}

fn ensure_ticket_access(ticket: &Ticket, user: &AuthUser) -> Result<(), ApiError> {
    if user.role == Role::Client && ticket.created_by != user.user_id {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }
    Ok(())
}

async fn resolve_author(store: &dyn Store, comment: Comment) -> Result<CommentView, ApiError> {
    let author = store
        .find_user(comment.author)
        .await?
        .map(|u| UserSummary::from(&u));
    Ok(CommentView { comment, author })
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let ticket = state
        .store
        .find_ticket(query.ticket_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;
    ensure_ticket_access(&ticket, &user)?;

    // Internal notes are filtered out of the result set for clients, not
    // merely hidden in the UI.
    let include_internal = user.is_agent();
    let comments = state
        .store
        .list_comments(ticket.id, include_internal)
        .await?;

    let mut views = Vec::with_capacity(comments.len());
    for comment in comments {
        views.push(resolve_author(state.store.as_ref(), comment).await?);
    }
    Ok(Json(views))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("Message is required".to_string()));
    }

    let ticket = state
        .store
        .find_ticket(req.ticket_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;
    ensure_ticket_access(&ticket, &user)?;

    // Only agents can write internal notes; a client asking for one gets a
    // regular comment instead of an error.
    let is_internal = user.is_agent() && req.is_internal.unwrap_or(false);

    let comment = Comment {
        id: Uuid::new_v4(),
        ticket_id: ticket.id,
        author: user.user_id,
        message: req.message.trim().to_string(),
        is_internal,
        created_at: Utc::now(),
    };
    state.store.insert_comment(comment.clone()).await?;
    info!(
        "Comment {} added to ticket {} by {} (internal: {})",
        comment.id, ticket.id, user.user_id, is_internal
    );

    let view = resolve_author(state.store.as_ref(), comment).await?;

    if user.is_agent() && !is_internal {
        let author_name = view
            .author
            .as_ref()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Support Agent".to_string());
        state.notify(&Notification::CommentAdded {
            ticket,
            comment: view.comment.clone(),
            author_name,
        });
    }

    Ok((StatusCode::CREATED, Json(view)))
}

pub fn configure_comments_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/comments", get(list_comments).post(add_comment))
}
