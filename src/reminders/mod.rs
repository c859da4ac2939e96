use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde::Serialize;
use tokio::time::interval;
use uuid::Uuid;

use crate::config::ReminderConfig;
use crate::email::{Notification, Notifier};
use crate::shared::error::ApiError;
use crate::shared::models::Ticket;
use crate::shared::state::AppState;
use crate::store::Store;

const SCAN_INTERVAL_SECS: u64 = 6 * 3600;

#[derive(Debug, Default, Serialize)]
pub struct ReminderReport {
    /// Active tickets old enough to qualify.
    pub scanned: usize,
    /// Of those, tickets with zero comments.
    pub unresponded: usize,
    pub notified_agents: usize,
    pub failed_agents: usize,
}

/// Periodic sweep for tickets nobody has responded to. The scheduled run and
/// the on-demand trigger share the same scan so the two paths cannot drift
/// apart.
pub struct ReminderService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
    in_flight: AtomicBool,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        config: ReminderConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            notifier,
            config,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Runs one guarded scan. Returns None when a scan is already in flight,
    /// which can happen if the scheduler fires while a manual trigger is
    /// still working.
    pub async fn run_scan(&self) -> Result<Option<ReminderReport>, ApiError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Reminder scan already in flight, skipping this run");
            return Ok(None);
        }
        let result = self.scan_at(Utc::now()).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    /// The scan itself, parameterized on `now` so the age threshold is
    /// deterministic under test.
    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<ReminderReport, ApiError> {
        let cutoff = now - Duration::hours(self.config.hours_threshold);
        info!(
            "Checking for unresponded tickets created at or before {}",
            cutoff
        );

        // Inclusive boundary: a ticket created exactly at the cutoff counts.
        let candidates = self.store.list_active_created_before(cutoff).await?;
        let mut report = ReminderReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        let mut by_agent: HashMap<Uuid, Vec<Ticket>> = HashMap::new();
        for ticket in candidates {
            if self.store.count_comments(ticket.id).await? > 0 {
                continue;
            }
            report.unresponded += 1;
            match ticket.assigned_to {
                Some(agent_id) => by_agent.entry(agent_id).or_default().push(ticket),
                None => {
                    // Unassigned: every agent hears about it, once each.
                    for agent in self.store.list_agents().await? {
                        let list = by_agent.entry(agent.id).or_default();
                        if !list.iter().any(|t| t.id == ticket.id) {
                            list.push(ticket.clone());
                        }
                    }
                }
            }
        }

        for (agent_id, tickets) in by_agent {
            let Some(agent) = self.store.find_user(agent_id).await? else {
                continue;
            };
            let batch = Notification::ReminderBatch {
                agent_email: agent.email.clone(),
                tickets,
            };
            // One agent's bounce must not starve the rest of the batch.
            match self.notifier.notify(&batch) {
                Ok(()) => {
                    report.notified_agents += 1;
                }
                Err(e) => {
                    error!("Failed to send reminder to {}: {}", agent.email, e);
                    report.failed_agents += 1;
                }
            }
        }

        info!(
            "Reminder check completed: {} scanned, {} unresponded, {} agents notified",
            report.scanned, report.unresponded, report.notified_agents
        );
        Ok(report)
    }

    /// Starts the recurring scan when enabled. Called exactly once from
    /// process startup; the in-flight flag above is what guards overlap, no
    /// ambient globals involved.
    pub fn spawn(self: &Arc<Self>) {
        if !self.config.enabled {
            info!("Reminder scheduler disabled");
            return;
        }
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(std::time::Duration::from_secs(SCAN_INTERVAL_SECS));
            // The first tick fires immediately; skip it so the schedule
            // matches "every 6 hours", not "at startup and then every 6h".
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = service.run_scan().await {
                    error!("Scheduled reminder scan failed: {}", e);
                }
            }
        });
        info!("Reminder scheduler started (every 6 hours)");
    }
}

fn check_cron_secret(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if let Some(secret) = &state.config.reminders.cron_secret {
        let expected = format!("Bearer {secret}");
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized("Unauthorized".to_string()));
        }
    }
    Ok(())
}

/// On-demand trigger used by external schedulers and operators. Same scan as
/// the timer path.
pub async fn trigger_scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_cron_secret(&state, &headers)?;
    match state.reminders.run_scan().await? {
        Some(report) => Ok(Json(serde_json::json!({
            "success": true,
            "report": report,
            "timestamp": Utc::now().to_rfc3339(),
        }))),
        None => Ok(Json(serde_json::json!({
            "success": false,
            "message": "Reminder scan already in progress",
        }))),
    }
}

pub fn configure_cron_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/cron/reminders", get(trigger_scan).post(trigger_scan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::TicketStatus;
    use crate::tests::test_util::{self, seed_agent, test_state, TestContext};

    fn service(state: &Arc<AppState>) -> Arc<ReminderService> {
        Arc::clone(&state.reminders)
    }

    async fn seed_aged_ticket(
        state: &Arc<AppState>,
        status: TicketStatus,
        age_hours: i64,
        assigned_to: Option<Uuid>,
    ) -> Ticket {
        let mut ticket = test_util::make_ticket(Uuid::new_v4(), status, age_hours);
        ticket.assigned_to = assigned_to;
        state.store.insert_ticket(ticket.clone()).await.unwrap();
        ticket
    }

    #[tokio::test]
    async fn threshold_boundary_is_inclusive() {
        let TestContext { state, notifier } = test_state().await;
        let agent = seed_agent(&state, "agent@example.com").await;
        let now = Utc::now();

        seed_aged_ticket(&state, TicketStatus::Open, 25, Some(agent.id)).await;
        let mut exact = test_util::make_ticket_created_at(
            Uuid::new_v4(),
            TicketStatus::Open,
            now - Duration::hours(24),
        );
        exact.assigned_to = Some(agent.id);
        state.store.insert_ticket(exact).await.unwrap();
        seed_aged_ticket(&state, TicketStatus::Open, 23, Some(agent.id)).await;

        let report = service(&state).scan_at(now).await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.unresponded, 2);
        assert_eq!(report.notified_agents, 1);

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Notification::ReminderBatch { tickets, .. } => assert_eq!(tickets.len(), 2),
            other => panic!("unexpected notification: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn commented_tickets_are_skipped_however_old() {
        let TestContext { state, notifier } = test_state().await;
        let agent = seed_agent(&state, "agent@example.com").await;
        let ticket = seed_aged_ticket(&state, TicketStatus::Open, 200, Some(agent.id)).await;
        state
            .store
            .insert_comment(test_util::make_comment(ticket.id, false))
            .await
            .unwrap();

        let report = service(&state).scan_at(Utc::now()).await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.unresponded, 0);
        assert_eq!(notifier.events().len(), 0);
    }

    #[tokio::test]
    async fn unassigned_ticket_is_broadcast_to_every_agent_once() {
        let TestContext { state, notifier } = test_state().await;
        seed_agent(&state, "a@example.com").await;
        seed_agent(&state, "b@example.com").await;
        seed_agent(&state, "c@example.com").await;
        let ticket = seed_aged_ticket(&state, TicketStatus::InProgress, 30, None).await;

        let report = service(&state).scan_at(Utc::now()).await.unwrap();
        assert_eq!(report.notified_agents, 3);

        for event in notifier.events() {
            match event {
                Notification::ReminderBatch { tickets, .. } => {
                    assert_eq!(tickets.len(), 1);
                    assert_eq!(tickets[0].id, ticket.id);
                }
                other => panic!("unexpected notification: {}", other.kind()),
            }
        }
    }

    #[tokio::test]
    async fn resolved_and_closed_tickets_never_qualify() {
        let TestContext { state, notifier } = test_state().await;
        let agent = seed_agent(&state, "agent@example.com").await;
        seed_aged_ticket(&state, TicketStatus::Resolved, 48, Some(agent.id)).await;
        seed_aged_ticket(&state, TicketStatus::Closed, 48, Some(agent.id)).await;

        let report = service(&state).scan_at(Utc::now()).await.unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(notifier.events().len(), 0);
    }

    #[tokio::test]
    async fn one_failing_agent_does_not_block_the_others() {
        let TestContext { state, notifier } = test_state().await;
        let bouncing = seed_agent(&state, "bounce@example.com").await;
        let healthy = seed_agent(&state, "ok@example.com").await;
        notifier.fail_for("bounce@example.com");

        seed_aged_ticket(&state, TicketStatus::Open, 40, Some(bouncing.id)).await;
        seed_aged_ticket(&state, TicketStatus::Open, 40, Some(healthy.id)).await;

        let report = service(&state).scan_at(Utc::now()).await.unwrap();
        assert_eq!(report.notified_agents, 1);
        assert_eq!(report.failed_agents, 1);
        // The delivery to the healthy agent was still attempted and landed.
        assert!(notifier
            .events()
            .iter()
            .any(|e| e.recipient() == "ok@example.com"));
    }

    #[tokio::test]
    async fn overlapping_scan_is_skipped() {
        let TestContext { state, .. } = test_state().await;
        let service = service(&state);
        service.in_flight.store(true, Ordering::SeqCst);
        assert!(service.run_scan().await.unwrap().is_none());
        service.in_flight.store(false, Ordering::SeqCst);
        assert!(service.run_scan().await.unwrap().is_some());
    }
}
