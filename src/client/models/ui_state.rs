use std::time::{Duration, Instant};

pub const DEFAULT_FLASH_TIMEOUT: Duration = Duration::from_millis(3000);

// Messaggio di notifica mostrato temporaneamente all'utente
#[derive(Debug, Clone)]
pub struct FlashState {
    text: Option<String>,
    expires_at: Option<Instant>,
    timeout: Duration,
}

impl Default for FlashState {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH_TIMEOUT)
    }
}

impl FlashState {
    pub fn new(timeout: Duration) -> Self {
        Self {
            text: None,
            expires_at: None,
            timeout,
        }
    }

    /// Shows `msg` and restarts the timeout. Blank messages and a repeat of the
    /// one on screen are ignored; returns whether it was shown.
    pub fn show(&mut self, msg: &str, now: Instant) -> bool {
        self.expire(now);
        let trimmed = msg.trim();
        if trimmed.is_empty() || self.text.as_deref() == Some(trimmed) {
            return false;
        }
        self.text = Some(trimmed.to_string());
        self.expires_at = Some(now + self.timeout);
        true
    }

    pub fn current(&mut self, now: Instant) -> Option<&str> {
        self.expire(now);
        self.text.as_deref()
    }

    fn expire(&mut self, now: Instant) {
        if matches!(self.expires_at, Some(at) if now >= at) {
            self.text = None;
            self.expires_at = None;
        }
    }
}
