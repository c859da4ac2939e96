pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::models::{Comment, Ticket, TicketPriority, TicketStatus, User};

pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Equality filters applied when listing tickets. Absent fields match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Document persistence seam. The server logic only depends on these typed
/// operations; the backing engine is swappable.
#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_agents(&self) -> Result<Vec<User>, StoreError>;

    // --- tickets ---
    async fn insert_ticket(&self, ticket: Ticket) -> Result<(), StoreError>;
    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;
    /// Replaces the stored ticket with the same id.
    async fn update_ticket(&self, ticket: Ticket) -> Result<(), StoreError>;
    /// Returns whether a ticket was actually removed.
    async fn delete_ticket(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Newest-first listing.
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;
    /// Open or in-progress tickets currently assigned to the given agent.
    async fn count_assigned_active(&self, agent_id: Uuid) -> Result<usize, StoreError>;
    /// Open or in-progress tickets created at or before the cutoff.
    async fn list_active_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError>;

    // --- comments ---
    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError>;
    /// Oldest-first; internal comments are excluded unless requested.
    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<Comment>, StoreError>;
    async fn count_comments(&self, ticket_id: Uuid) -> Result<usize, StoreError>;
}
