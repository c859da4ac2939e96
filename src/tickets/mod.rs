pub mod assign;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
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
use crate::shared::models::{
    Role, Ticket, TicketPriority, TicketStatus, TicketView, UserSummary,
};
use crate::shared::state::AppState;
use crate::shared::validators::{join_errors, validate_ticket_input};
use crate::store::{Store, StoreError, TicketFilter};

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub name: String,
    pub email: String,
    pub description: String,
    pub priority: Option<TicketPriority>,
}

/// Patch applied by `update_ticket`. Fields a client is not allowed to touch
/// are silently dropped, not rejected.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
    pub expand: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    pub expand: Option<bool>,
}

/// Applies a role-gated patch in place. Agents may set every mutable field;
/// clients only description and priority. `created_by` is immutable for
/// everyone.
pub fn apply_patch(ticket: &mut Ticket, patch: &UpdateTicketRequest, role: Role) {
    if let Some(description) = &patch.description {
        ticket.description = description.clone();
    }
    if let Some(priority) = patch.priority {
        ticket.priority = priority;
    }
    if role != Role::Agent {
        return;
    }
    if let Some(title) = &patch.title {
        ticket.title = title.clone();
    }
    if let Some(name) = &patch.name {
        ticket.name = name.clone();
    }
    if let Some(email) = &patch.email {
        ticket.email = email.clone();
    }
    if let Some(status) = patch.status {
        ticket.status = status;
    }
    if let Some(assigned_to) = patch.assigned_to {
        ticket.assigned_to = Some(assigned_to);
    }
}

fn ensure_can_view(ticket: &Ticket, user: &AuthUser) -> Result<(), ApiError> {
    if user.role == Role::Client && ticket.created_by != user.user_id {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }
    Ok(())
}

/// Resolves the user references on a ticket into display summaries.
pub async fn resolve_view(store: &dyn Store, ticket: Ticket) -> Result<TicketView, StoreError> {
    let created_by = store
        .find_user(ticket.created_by)
        .await?
        .map(|u| UserSummary::from(&u));
    let assigned_to = match ticket.assigned_to {
        Some(id) => store.find_user(id).await?.map(|u| UserSummary::from(&u)),
        None => None,
    };
    Ok(TicketView {
        ticket,
        created_by,
        assigned_to,
    })
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketView>), ApiError> {
    let errors = validate_ticket_input(&req.title, &req.name, &req.email, &req.description);
    if !errors.is_empty() {
        return Err(ApiError::Validation(join_errors(&errors)));
    }

    let counts = assign::agent_open_counts(state.store.as_ref()).await?;
    let assigned_to = assign::pick_min_loaded(&counts, &mut rand::rng());

    let now = Utc::now();
    let ticket = Ticket {
        id: Uuid::new_v4(),
        title: req.title.trim().to_string(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_lowercase(),
        description: req.description.trim().to_string(),
        created_by: user.user_id,
        assigned_to,
        // New tickets always start open, whatever the caller sent.
        status: TicketStatus::Open,
        priority: req.priority.unwrap_or(TicketPriority::Medium),
        created_at: now,
        updated_at: now,
    };
    state.store.insert_ticket(ticket.clone()).await?;
    info!(
        "Ticket {} created by {} (assigned to {:?})",
        ticket.id, user.user_id, assigned_to
    );

    state.notify(&Notification::TicketCreated {
        ticket: ticket.clone(),
    });

    let view = resolve_view(state.store.as_ref(), ticket).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let filter = TicketFilter {
        status: query.status,
        priority: query.priority,
        assigned_to: query.assigned_to,
        // Clients only ever see their own tickets.
        created_by: (user.role == Role::Client).then_some(user.user_id),
    };
    let tickets = state.store.list_tickets(&filter).await?;

    if query.expand.unwrap_or(false) {
        let mut views = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            views.push(resolve_view(state.store.as_ref(), ticket).await?);
        }
        Ok(Json(views).into_response())
    } else {
        Ok(Json(tickets).into_response())
    }
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<GetQuery>,
) -> Result<Response, ApiError> {
    let ticket = state
        .store
        .find_ticket(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;
    ensure_can_view(&ticket, &user)?;

    if query.expand.unwrap_or(false) {
        let view = resolve_view(state.store.as_ref(), ticket).await?;
        Ok(Json(view).into_response())
    } else {
        Ok(Json(ticket).into_response())
    }
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateTicketRequest>,
) -> Result<Json<TicketView>, ApiError> {
    let mut ticket = state
        .store
        .find_ticket(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;
    ensure_can_view(&ticket, &user)?;

    // The closed-transition check compares against the status as it was
    // before the patch touched anything.
    let previous_status = ticket.status;
    apply_patch(&mut ticket, &patch, user.role);
    ticket.updated_at = Utc::now();
    state.store.update_ticket(ticket.clone()).await?;

    if previous_status != TicketStatus::Closed && ticket.status == TicketStatus::Closed {
        state.notify(&Notification::TicketClosed {
            ticket: ticket.clone(),
        });
    }

    let view = resolve_view(state.store.as_ref(), ticket).await?;
    Ok(Json(view))
}

pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !user.is_agent() {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }
    let ticket = state
        .store
        .find_ticket(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;
    if ticket.status != TicketStatus::Closed {
        return Err(ApiError::Validation(
            "Only closed tickets can be deleted".to_string(),
        ));
    }
    state.store.delete_ticket(id).await?;
    info!("Ticket {} deleted by {}", id, user.user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/api/tickets/{id}",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
}
