use std::env;
use std::time::Duration;

use crate::client::models::ui_state::DEFAULT_FLASH_TIMEOUT;
use crate::client::services::board_service::DEFAULT_MAX_COLUMNS;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host[:port]` of the board server.
    pub host: String,
    /// Board endpoint path; the websocket lives at `<path>/ws`.
    pub path: String,
    pub secure: bool,
    pub reconnect_delay: Duration,
    pub timer_dwell: Duration,
    pub notification_timeout: Duration,
    pub max_columns: usize,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:8080".to_string(),
            path: "/board".to_string(),
            secure: false,
            reconnect_delay: Duration::from_secs(5),
            timer_dwell: Duration::from_secs(5),
            notification_timeout: DEFAULT_FLASH_TIMEOUT,
            max_columns: DEFAULT_MAX_COLUMNS,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            host: env::var("BOARD_HOST").unwrap_or(defaults.host),
            path: env::var("BOARD_PATH").unwrap_or(defaults.path),
            secure: env::var("BOARD_SECURE").map(|v| v == "true" || v == "1").unwrap_or(false),
            reconnect_delay: env::var("RECONNECT_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconnect_delay),
            timer_dwell: env::var("TIMER_DWELL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timer_dwell),
            notification_timeout: env::var("NOTIFICATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.notification_timeout),
            max_columns: env::var("MAX_COLUMNS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.max_columns),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}
