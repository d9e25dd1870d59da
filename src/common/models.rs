use serde::{Deserialize, Serialize};

/// Rappresenta un partecipante della board (identità stabile assegnata dal server)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_id: u32,
}

/// Una singola connessione (tab/dispositivo) di un utente
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub user: User,
    /// Joined-at timestamp. The legacy roster message calls it `joined_at`.
    #[serde(default, alias = "joined_at")]
    pub created_at: i64,
}

impl Client {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub column_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running,
    Paused,
    Done,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Stopped => "stopped",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Done => "done",
        }
    }
}

/// Stato del timer condiviso, sempre sostituito per intero dal server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub status: TimerStatus,
    pub display: String,
}

impl TimerState {
    pub fn stopped() -> Self {
        Self {
            status: TimerStatus::Stopped,
            display: "00:00".to_string(),
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::stopped()
    }
}
