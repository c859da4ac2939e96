use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub reminders: ReminderConfig,
    /// Base URL used to build ticket links in outbound mail.
    pub app_url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Empty host means no SMTP relay is configured; notifications fall back
    /// to the logging notifier.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub hours_threshold: i64,
    /// Shared secret for the on-demand cron trigger endpoint; unset means
    /// the endpoint is open (development only).
    pub cron_secret: Option<String>,
}

fn get_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: get_str("SERVER_HOST", "0.0.0.0"),
                port: get_u16("SERVER_PORT", 8080),
            },
            auth: AuthConfig {
                jwt_secret: get_str("JWT_SECRET", "fallback-secret-key"),
                token_ttl_days: get_i64("JWT_TTL_DAYS", 7),
            },
            email: EmailConfig {
                host: get_str("EMAIL_HOST", ""),
                port: get_u16("EMAIL_PORT", 587),
                username: get_str("EMAIL_USER", ""),
                password: get_str("EMAIL_PASS", ""),
                from: get_str("EMAIL_FROM", "support@deskserver.local"),
            },
            reminders: ReminderConfig {
                enabled: get_bool("CRON_REMINDER_ENABLED", false),
                hours_threshold: get_i64("CRON_REMINDER_HOURS_THRESHOLD", 24),
                cron_secret: env::var("CRON_SECRET").ok(),
            },
            app_url: get_str("APP_URL", "http://localhost:8080"),
        }
    }
}
