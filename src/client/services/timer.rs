use std::time::{Duration, Instant};

use log::{debug, info};

use crate::common::duration::parse_timer_duration;
use crate::common::error::BoardError;
use crate::common::models::{TimerState, TimerStatus};
use crate::common::protocol::{ClientCommand, TimerCmdKind};

pub const DEFAULT_DWELL: Duration = Duration::from_secs(5);

/// What changed after a server push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerTransition {
    /// The push moved the timer into `done`; the sound fires once per such move.
    pub entered_done: bool,
}

/// Mirrors the shared countdown. The server drives every transition; the only
/// local behaviour is the display cooldown after `done`.
#[derive(Debug, Clone)]
pub struct TimerMachine {
    state: TimerState,
    dwell: Duration,
    dwell_deadline: Option<Instant>,
}

impl Default for TimerMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}

impl TimerMachine {
    pub fn new(dwell: Duration) -> Self {
        Self {
            state: TimerState::stopped(),
            dwell,
            dwell_deadline: None,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    /// The timer bar is shown for anything but `stopped`.
    pub fn is_visible(&self) -> bool {
        self.state.status != TimerStatus::Stopped
    }

    /// Applies a `timer.state` push.
    pub fn apply(&mut self, pushed: TimerState, now: Instant) -> TimerTransition {
        let entered_done =
            pushed.status == TimerStatus::Done && self.state.status != TimerStatus::Done;
        debug!("[TIMER] {} -> {} ({})", self.state.status.as_str(), pushed.status.as_str(), pushed.display);

        self.state = pushed;
        if entered_done {
            info!("[TIMER] time's up");
            self.dwell_deadline = Some(now + self.dwell);
        } else if self.state.status != TimerStatus::Done {
            // any fresh state supersedes a pending cooldown
            self.dwell_deadline = None;
        }
        TimerTransition { entered_done }
    }

    pub fn dwell_deadline(&self) -> Option<Instant> {
        self.dwell_deadline
    }

    /// Ends the post-`done` cooldown once its deadline has passed. The revert to
    /// `stopped` is display-only and never reported to the server.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.dwell_deadline {
            Some(deadline) if now >= deadline => {
                self.dwell_deadline = None;
                self.state = TimerState::stopped();
                debug!("[TIMER] cooldown over, back to stopped");
                true
            }
            _ => false,
        }
    }

    /// `start` is possible from `stopped` or `done` only. The duration is checked
    /// locally and sent verbatim.
    pub fn start_command(&self, value: &str) -> Result<Option<ClientCommand>, BoardError> {
        parse_timer_duration(value)?;
        match self.state.status {
            TimerStatus::Stopped | TimerStatus::Done => Ok(Some(ClientCommand::TimerCmd {
                cmd: TimerCmdKind::Start,
                value: Some(value.trim().to_string()),
            })),
            _ => Ok(None),
        }
    }

    pub fn pause_command(&self) -> Option<ClientCommand> {
        (self.state.status == TimerStatus::Running).then_some(ClientCommand::TimerCmd {
            cmd: TimerCmdKind::Pause,
            value: None,
        })
    }

    /// Resume travels as a bare `start`.
    pub fn resume_command(&self) -> Option<ClientCommand> {
        (self.state.status == TimerStatus::Paused).then_some(ClientCommand::TimerCmd {
            cmd: TimerCmdKind::Start,
            value: None,
        })
    }

    pub fn stop_command(&self) -> Option<ClientCommand> {
        self.is_visible().then_some(ClientCommand::TimerCmd {
            cmd: TimerCmdKind::Stop,
            value: None,
        })
    }
}
