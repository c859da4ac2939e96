use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::shared::models::{Comment, Ticket, User};

use super::{Store, StoreError, TicketFilter};

/// In-process document store. Backs the default binary and the test suite;
/// a networked engine can replace it behind the same trait.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tickets: RwLock<HashMap<Uuid, Ticket>>,
    comments: RwLock<HashMap<Uuid, Comment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(StoreError::Duplicate(format!("users.email: {email}")));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn list_agents(&self) -> Result<Vec<User>, StoreError> {
        let mut agents: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.role == crate::shared::models::Role::Agent)
            .cloned()
            .collect();
        agents.sort_by_key(|u| u.created_at);
        Ok(agents)
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.tickets.write().await.insert(ticket.id, ticket);
        Ok(())
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tickets.read().await.get(&id).cloned())
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.tickets.write().await.insert(ticket.id, ticket);
        Ok(())
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tickets.write().await.remove(&id).is_some())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.priority.map_or(true, |p| t.priority == p))
            .filter(|t| filter.assigned_to.map_or(true, |a| t.assigned_to == Some(a)))
            .filter(|t| filter.created_by.map_or(true, |c| t.created_by == c))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn count_assigned_active(&self, agent_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| t.assigned_to == Some(agent_id) && t.status.is_active())
            .count())
    }

    async fn list_active_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| t.status.is_active() && t.created_at <= cutoff)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError> {
        self.comments.write().await.insert(comment.id, comment);
        Ok(())
    }

    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<Comment>, StoreError> {
        let mut comments: Vec<Comment> = self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.ticket_id == ticket_id)
            .filter(|c| include_internal || !c.is_internal)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn count_comments(&self, ticket_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.ticket_id == ticket_id)
            .count())
    }
}
