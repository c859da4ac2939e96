use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use crate::config::EmailConfig;
use crate::shared::models::{Comment, Ticket};

/// Outbound notification kinds. Every variant carries what the template
/// needs; delivery is best-effort and never blocks the triggering write.
#[derive(Debug, Clone)]
pub enum Notification {
    TicketCreated {
        ticket: Ticket,
    },
    CommentAdded {
        ticket: Ticket,
        comment: Comment,
        author_name: String,
    },
    TicketClosed {
        ticket: Ticket,
    },
    ReminderBatch {
        agent_email: String,
        tickets: Vec<Ticket>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TicketCreated { .. } => "ticket_created",
            Notification::CommentAdded { .. } => "comment_added",
            Notification::TicketClosed { .. } => "ticket_closed",
            Notification::ReminderBatch { .. } => "reminder_batch",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::TicketCreated { ticket } => &ticket.email,
            Notification::CommentAdded { ticket, .. } => &ticket.email,
            Notification::TicketClosed { ticket } => &ticket.email,
            Notification::ReminderBatch { agent_email, .. } => agent_email,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid message: {0}")]
    Message(String),
    #[error("mail transport error: {0}")]
    Transport(String),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Notification) -> Result<(), NotifyError>;
}

/// Delivers notifications over an SMTP relay.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: String,
    app_url: String,
}

impl SmtpNotifier {
    pub fn from_config(cfg: &EmailConfig, app_url: &str) -> Result<Self, NotifyError> {
        let mut builder = SmtpTransport::relay(&cfg.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(cfg.port);
        if !cfg.username.is_empty() {
            builder = builder
                .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: cfg.from.clone(),
            app_url: app_url.to_string(),
        })
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, event: &Notification) -> Result<(), NotifyError> {
        let (subject, html) = render(event, &self.app_url);
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| NotifyError::Message(format!("from address: {e}")))?,
            )
            .to(event
                .recipient()
                .parse()
                .map_err(|e| NotifyError::Message(format!("recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| NotifyError::Message(e.to_string()))?;
        self.transport
            .send(&message)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        info!(
            "Sent {} notification to {}",
            event.kind(),
            event.recipient()
        );
        Ok(())
    }
}

/// Development fallback used when no SMTP relay is configured: logs the mail
/// instead of sending it.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Notification) -> Result<(), NotifyError> {
        info!(
            "email disabled, dropping {} notification for {}",
            event.kind(),
            event.recipient()
        );
        Ok(())
    }
}

fn render(event: &Notification, app_url: &str) -> (String, String) {
    match event {
        Notification::TicketCreated { ticket } => (
            format!("Ticket Created: {}", ticket.title),
            format!(
                "<h2>Ticket Created Successfully</h2>\
                 <p>Your support ticket has been created and our team will review it shortly.</p>\
                 <p><strong>Ticket ID:</strong> {}</p>\
                 <p><strong>Title:</strong> {}</p>\
                 <p><strong>Description:</strong> {}</p>\
                 <p><strong>Priority:</strong> {}</p>\
                 <p><strong>Status:</strong> {}</p>\
                 <p><a href=\"{}/client/ticket/{}\">View Ticket</a></p>",
                ticket.id,
                ticket.title,
                ticket.description,
                ticket.priority.as_str().to_uppercase(),
                ticket.status.as_str().to_uppercase(),
                app_url,
                ticket.id,
            ),
        ),
        Notification::CommentAdded {
            ticket,
            comment,
            author_name,
        } => (
            format!("New Response: {}", ticket.title),
            format!(
                "<h2>New Response to Your Ticket</h2>\
                 <p>A support agent has responded to your ticket.</p>\
                 <h3>Ticket: {}</h3>\
                 <p><strong>From:</strong> {}</p>\
                 <p style=\"white-space: pre-wrap;\">{}</p>\
                 <p><a href=\"{}/client/ticket/{}\">View Ticket</a></p>",
                ticket.title, author_name, comment.message, app_url, ticket.id,
            ),
        ),
        Notification::TicketClosed { ticket } => (
            format!("Ticket Closed: {}", ticket.title),
            format!(
                "<h2>Ticket Closed</h2>\
                 <p>Your support ticket has been closed.</p>\
                 <p><strong>Ticket ID:</strong> {}</p>\
                 <p><strong>Title:</strong> {}</p>\
                 <p>If you need further assistance, please create a new ticket.</p>\
                 <p><a href=\"{}/client/ticket/{}\">View Ticket</a></p>",
                ticket.id, ticket.title, app_url, ticket.id,
            ),
        ),
        Notification::ReminderBatch { tickets, .. } => {
            let items: String = tickets
                .iter()
                .map(|t| {
                    format!(
                        "<li><strong>{}</strong> (Priority: {})<br/>Created: {}<br/>\
                         <a href=\"{}/agent/ticket/{}\">View Ticket</a></li>",
                        t.title,
                        t.priority.as_str(),
                        t.created_at.format("%Y-%m-%d"),
                        app_url,
                        t.id,
                    )
                })
                .collect();
            (
                format!("Reminder: {} Ticket(s) Pending Response", tickets.len()),
                format!(
                    "<h2>Tickets Pending Response</h2>\
                     <p>You have {} ticket(s) that need your attention:</p>\
                     <ul>{}</ul>\
                     <p><a href=\"{}/agent\">View Dashboard</a></p>",
                    tickets.len(),
                    items,
                    app_url,
                ),
            )
        }
    }
}
