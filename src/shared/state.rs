use std::sync::Arc;

use log::error;

use crate::config::AppConfig;
use crate::email::{Notification, Notifier};
use crate::reminders::ReminderService;
use crate::store::Store;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub reminders: Arc<ReminderService>,
}

impl AppState {
    /// Best-effort notification dispatch. Delivery failures are logged and
    /// swallowed; the triggering write has already committed.
    pub fn notify(&self, event: &Notification) {
        if let Err(e) = self.notifier.notify(event) {
            error!(
                "Failed to send {} notification to {}: {}",
                event.kind(),
                event.recipient(),
                e
            );
        }
    }
}
