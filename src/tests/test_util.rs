//! Shared fixtures for the test suite: an in-memory app state wired to a
//! recording notifier, plus builders for users, tickets and comments.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::{AppConfig, AuthConfig, EmailConfig, ReminderConfig, ServerConfig};
use crate::auth::AuthUser;
use crate::email::{Notification, Notifier, NotifyError};
use crate::reminders::ReminderService;
use crate::shared::models::{Comment, Role, Ticket, TicketPriority, TicketStatus, User};
use crate::shared::state::AppState;
use crate::store::{MemoryStore, Store};

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
}

#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(err) => err,
        }
    };
}

/// Notifier that records every delivery attempt and can be told to bounce
/// mail for specific recipients.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
    fail_recipients: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn fail_for(&self, recipient: &str) {
        self.fail_recipients
            .lock()
            .unwrap()
            .insert(recipient.to_string());
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &Notification) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        if self
            .fail_recipients
            .lock()
            .unwrap()
            .contains(event.recipient())
        {
            return Err(NotifyError::Transport("simulated bounce".to_string()));
        }
        Ok(())
    }
}

pub struct TestContext {
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 7,
        },
        email: EmailConfig {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "support@deskserver.local".to_string(),
        },
        reminders: ReminderConfig {
            enabled: false,
            hours_threshold: 24,
            cron_secret: None,
        },
        app_url: "http://localhost:8080".to_string(),
    }
}

pub async fn test_state() -> TestContext {
    setup();
    let config = Arc::new(test_config());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let reminders = ReminderService::new(
        Arc::clone(&store),
        notifier.clone() as Arc<dyn Notifier>,
        config.reminders.clone(),
    );
    let state = Arc::new(AppState {
        config,
        store,
        notifier: notifier.clone(),
        reminders,
    });
    TestContext { state, notifier }
}

pub fn make_user(role: Role, email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Test User".to_string(),
        email: email.to_string(),
        password_hash: "unusable".to_string(),
        role,
        created_at: now,
        updated_at: now,
    }
}

pub fn auth_user(role: Role) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        email: "caller@example.com".to_string(),
        role,
    }
}

pub fn auth_for(user: &User) -> AuthUser {
    AuthUser {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

pub fn make_ticket_created_at(
    created_by: Uuid,
    status: TicketStatus,
    created_at: DateTime<Utc>,
) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        title: "Test ticket".to_string(),
        name: "Reporter".to_string(),
        email: "reporter@example.com".to_string(),
        description: "Something is wrong".to_string(),
        created_by,
        assigned_to: None,
        status,
        priority: TicketPriority::Medium,
        created_at,
        updated_at: created_at,
    }
}

pub fn make_ticket(created_by: Uuid, status: TicketStatus, age_hours: i64) -> Ticket {
    make_ticket_created_at(created_by, status, Utc::now() - Duration::hours(age_hours))
}

pub fn make_comment(ticket_id: Uuid, is_internal: bool) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        ticket_id,
        author: Uuid::new_v4(),
        message: "a comment".to_string(),
        is_internal,
        created_at: Utc::now(),
    }
}

pub async fn seed_agent(state: &Arc<AppState>, email: &str) -> User {
    let agent = make_user(Role::Agent, email);
    state.store.insert_user(agent.clone()).await.unwrap();
    agent
}

pub async fn seed_ticket(
    state: &Arc<AppState>,
    created_by: Uuid,
    status: TicketStatus,
    age_hours: i64,
) -> Ticket {
    let ticket = make_ticket(created_by, status, age_hours);
    state.store.insert_ticket(ticket.clone()).await.unwrap();
    ticket
}
