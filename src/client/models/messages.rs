use crate::client::services::standup::SpeakerTurn;
use crate::common::models::{TimerState, User};

/// Effetti prodotti dall'applicazione di un messaggio del server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// Identity confirmed by the server after the handshake.
    Identified(User),
    ColumnsChanged,
    CardsChanged,
    /// Unique users or their order changed.
    PresenceChanged,
    /// Board notification from another participant.
    Notification(String),
    TimerUpdated(TimerState),
    /// The timer just reached `done`: play the sound.
    TimerDone,
    /// The post-`done` cooldown ended and the timer is shown as stopped again.
    TimerCleared,
    SpeakerTurn(SpeakerTurn),
}

impl BoardEvent {
    /// Text to flash to the user, if the event carries one.
    pub fn flash_text(&self) -> Option<String> {
        match self {
            BoardEvent::Notification(text) => Some(text.clone()),
            BoardEvent::SpeakerTurn(turn) => Some(turn.announcement()),
            _ => None,
        }
    }
}
