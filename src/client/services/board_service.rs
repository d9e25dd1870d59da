use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::mpsc;

use crate::client::models::board_state::BoardState;
use crate::client::models::messages::BoardEvent;
use crate::client::services::reducer::ChangeLogReducer;
use crate::client::services::standup::{ShuffleSource, SpeakerTurn};
use crate::common::error::BoardError;
use crate::common::protocol::ClientCommand;

pub const DEFAULT_MAX_COLUMNS: usize = 6;

/// The board as one participant sees it: inbound frames go through
/// [`BoardSession::deliver`], user intents become [`ClientCommand`]s on the
/// outgoing channel. Nothing here waits for the server to acknowledge.
pub struct BoardSession {
    state: BoardState,
    outgoing: mpsc::UnboundedSender<ClientCommand>,
    max_columns: usize,
}

impl BoardSession {
    pub fn new(outgoing: mpsc::UnboundedSender<ClientCommand>) -> Self {
        Self::with_state(BoardState::new(), outgoing)
    }

    pub fn with_state(state: BoardState, outgoing: mpsc::UnboundedSender<ClientCommand>) -> Self {
        Self {
            state,
            outgoing,
            max_columns: DEFAULT_MAX_COLUMNS,
        }
    }

    pub fn with_timer_dwell(dwell: Duration, outgoing: mpsc::UnboundedSender<ClientCommand>) -> Self {
        Self::with_state(BoardState::with_timer_dwell(dwell), outgoing)
    }

    /// Points intents at a new connection, e.g. after reconnecting under another name.
    pub fn set_outgoing(&mut self, outgoing: mpsc::UnboundedSender<ClientCommand>) {
        self.outgoing = outgoing;
    }

    pub fn set_max_columns(&mut self, max_columns: usize) {
        self.max_columns = max_columns;
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Single entry point for inbound frames, in receipt order.
    pub fn deliver(&mut self, raw: &str, now: Instant) -> Vec<BoardEvent> {
        ChangeLogReducer::handle_raw(&mut self.state, raw, now)
    }

    /// Next instant at which [`BoardSession::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.timer.dwell_deadline()
    }

    pub fn tick(&mut self, now: Instant) -> Vec<BoardEvent> {
        if self.state.timer.tick(now) {
            vec![BoardEvent::TimerCleared]
        } else {
            Vec::new()
        }
    }

    fn send(&self, command: ClientCommand) -> Result<(), BoardError> {
        debug!("[BOARD] -> {}", command.kind());
        self.outgoing
            .send(command)
            .map_err(|_| BoardError::NotConnected)
    }

    fn non_empty(name: &str) -> Result<String, BoardError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            Err(BoardError::EmptyName)
        } else {
            Ok(trimmed.to_string())
        }
    }

    pub fn create_column(&self, name: &str) -> Result<(), BoardError> {
        if self.state.store.columns.len() >= self.max_columns {
            return Err(BoardError::ColumnLimit(self.max_columns));
        }
        let name = Self::non_empty(name)?;
        self.send(ClientCommand::ColumnNew { name })
    }

    pub fn rename_column(&self, column_id: &str, name: &str) -> Result<(), BoardError> {
        let mut column = self
            .state
            .store
            .columns
            .get(column_id)
            .cloned()
            .ok_or_else(|| BoardError::UnknownColumn(column_id.to_string()))?;
        column.name = Self::non_empty(name)?;
        self.send(ClientCommand::ColumnUpdate(column))
    }

    pub fn delete_column(&self, column_id: &str) -> Result<(), BoardError> {
        self.send(ClientCommand::ColumnDelete {
            id: column_id.to_string(),
        })
    }

    pub fn create_card(&self, column_id: &str, name: &str) -> Result<(), BoardError> {
        let name = Self::non_empty(name)?;
        self.send(ClientCommand::CardNew {
            name,
            column_id: column_id.to_string(),
        })
    }

    pub fn edit_card(&self, card_id: &str, name: &str) -> Result<(), BoardError> {
        let mut card = self.card(card_id)?;
        card.name = Self::non_empty(name)?;
        self.send(ClientCommand::CardUpdate(card))
    }

    /// Moves a card to another column. Returns `false` when it already sits there.
    pub fn move_card(&self, card_id: &str, column_id: &str) -> Result<bool, BoardError> {
        let mut card = self.card(card_id)?;
        if card.column_id == column_id {
            return Ok(false);
        }
        card.column_id = column_id.to_string();
        self.send(ClientCommand::CardUpdate(card))?;
        Ok(true)
    }

    pub fn delete_card(&self, card_id: &str) -> Result<(), BoardError> {
        self.send(ClientCommand::CardDelete {
            id: card_id.to_string(),
        })
    }

    pub fn vote_card(&self, card_id: &str, vote: i32) -> Result<(), BoardError> {
        if vote != 1 && vote != -1 {
            return Err(BoardError::InvalidVote(vote));
        }
        self.send(ClientCommand::CardVote {
            id: card_id.to_string(),
            vote,
        })
    }

    fn card(&self, card_id: &str) -> Result<crate::common::models::Card, BoardError> {
        self.state
            .store
            .cards
            .get(card_id)
            .cloned()
            .ok_or_else(|| BoardError::UnknownCard(card_id.to_string()))
    }

    /// Returns whether a command went out; a start while the timer is already
    /// running or paused is swallowed.
    pub fn start_timer(&self, duration: &str) -> Result<bool, BoardError> {
        match self.state.timer.start_command(duration)? {
            Some(command) => self.send(command).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn pause_timer(&self) -> Result<bool, BoardError> {
        self.send_guarded(self.state.timer.pause_command())
    }

    pub fn resume_timer(&self) -> Result<bool, BoardError> {
        self.send_guarded(self.state.timer.resume_command())
    }

    pub fn stop_timer(&self) -> Result<bool, BoardError> {
        self.send_guarded(self.state.timer.stop_command())
    }

    fn send_guarded(&self, command: Option<ClientCommand>) -> Result<bool, BoardError> {
        match command {
            Some(command) => self.send(command).map(|_| true),
            None => {
                debug!("[TIMER] command suppressed in state {}", self.state.timer.status().as_str());
                Ok(false)
            }
        }
    }

    pub fn start_standup(&mut self) -> Result<SpeakerTurn, BoardError> {
        self.start_standup_with(&mut rand::thread_rng())
    }

    pub fn start_standup_with<S: ShuffleSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<SpeakerTurn, BoardError> {
        let participants = self.state.presence.users().to_vec();
        let turn = self.state.standup.start(&participants, source)?;
        info!("[STANDUP] {}", turn.announcement());
        Ok(turn)
    }

    pub fn select_speaker(&mut self, user_id: &str) -> Result<SpeakerTurn, BoardError> {
        self.state.standup.advance(user_id)
    }

    pub fn next_speaker(&mut self) -> Result<Option<SpeakerTurn>, BoardError> {
        self.state.standup.next()
    }

    pub fn close_standup(&mut self) {
        self.state.standup.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::protocol::TimerCmdKind;
    use serde_json::json;

    fn session() -> (BoardSession, mpsc::UnboundedReceiver<ClientCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (BoardSession::new(tx), rx)
    }

    fn push(s: &mut BoardSession, value: serde_json::Value) -> Vec<BoardEvent> {
        s.deliver(&value.to_string(), Instant::now())
    }

    fn add_column(s: &mut BoardSession, id: &str, at: i64) {
        push(
            s,
            json!({"type": "columns", "op": "put", "id": id, "obj": {"id": id, "name": id, "created_at": at}}),
        );
    }

    #[test]
    fn column_limit_is_local() {
        let (mut s, mut rx) = session();
        for i in 0..6 {
            add_column(&mut s, &format!("c{i}"), i);
        }
        assert_eq!(s.create_column("seventh"), Err(BoardError::ColumnLimit(6)));
        assert!(rx.try_recv().is_err());

        push(&mut s, json!({"type": "columns", "op": "del", "id": "c0"}));
        s.create_column(" Ideas ").unwrap();
        assert_eq!(rx.try_recv().unwrap(), ClientCommand::ColumnNew { name: "Ideas".into() });
    }

    #[test]
    fn empty_names_and_bad_votes_never_leave() {
        let (s, mut rx) = session();
        assert_eq!(s.create_column("  "), Err(BoardError::EmptyName));
        assert_eq!(s.create_card("c1", ""), Err(BoardError::EmptyName));
        assert_eq!(s.vote_card("k1", 2), Err(BoardError::InvalidVote(2)));
        assert!(rx.try_recv().is_err());

        s.vote_card("k1", -1).unwrap();
        assert_eq!(rx.try_recv().unwrap(), ClientCommand::CardVote { id: "k1".into(), vote: -1 });
    }

    #[test]
    fn moving_a_card_sends_update() {
        let (mut s, mut rx) = session();
        push(
            &mut s,
            json!({"type": "cards", "op": "put", "id": "k1",
                   "obj": {"id": "k1", "name": "Ship it", "column_id": "c1", "created_at": 2, "votes": 3}}),
        );

        assert!(!s.move_card("k1", "c1").unwrap());
        assert!(s.move_card("k1", "c2").unwrap());
        match rx.try_recv().unwrap() {
            ClientCommand::CardUpdate(card) => {
                assert_eq!(card.column_id, "c2");
                assert_eq!(card.votes, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(s.move_card("nope", "c2"), Err(BoardError::UnknownCard("nope".into())));
        // local state only changes when the server says so
        assert_eq!(s.state().store.cards.get("k1").unwrap().column_id, "c1");
    }

    #[test]
    fn timer_guards_make_no_network_call() {
        let (mut s, mut rx) = session();
        assert_eq!(s.pause_timer(), Ok(false));
        assert_eq!(s.resume_timer(), Ok(false));
        assert_eq!(s.stop_timer(), Ok(false));
        assert!(rx.try_recv().is_err());

        assert_eq!(s.start_timer("5m30s"), Ok(true));
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientCommand::TimerCmd { cmd: TimerCmdKind::Start, value: Some("5m30s".into()) }
        );

        push(&mut s, json!({"type": "timer.state", "data": {"status": "running", "display": "05:30"}}));
        assert_eq!(s.start_timer("1m"), Ok(false));
        assert_eq!(s.pause_timer(), Ok(true));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dwell_revert_needs_no_outbound_command() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = BoardSession::with_timer_dwell(Duration::from_secs(5), tx);
        let t0 = Instant::now();

        let events = s.deliver(r#"{"type":"timer.state","data":{"status":"done","display":"00:00"}}"#, t0);
        assert_eq!(events.iter().filter(|e| **e == BoardEvent::TimerDone).count(), 1);
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_secs(5)));

        assert!(s.tick(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(s.tick(t0 + Duration::from_secs(5)), vec![BoardEvent::TimerCleared]);
        assert!(!s.state().timer.is_visible());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn standup_requires_two_users() {
        let (mut s, mut rx) = session();
        push(
            &mut s,
            json!({"type": "clients", "op": "put", "id": "c1",
                   "obj": {"id": "c1", "user": {"id": "u1", "name": "alice"}, "created_at": 1}}),
        );
        push(
            &mut s,
            json!({"type": "clients", "op": "put", "id": "c2",
                   "obj": {"id": "c2", "user": {"id": "u1", "name": "alice"}, "created_at": 2}}),
        );
        // two tabs, one user
        assert_eq!(s.start_standup().unwrap_err(), BoardError::NotEnoughParticipants);
        assert!(rx.try_recv().is_err());

        push(
            &mut s,
            json!({"type": "clients", "op": "put", "id": "c3",
                   "obj": {"id": "c3", "user": {"id": "u2", "name": "bob"}, "created_at": 3}}),
        );
        let turn = s.start_standup().unwrap();
        assert!(turn.first);
        assert_eq!(s.state().standup.order().len(), 2);
        assert_eq!(s.start_standup().unwrap_err(), BoardError::StandupActive);

        s.close_standup();
        assert!(!s.state().standup.is_active());
    }

    #[test]
    fn closed_channel_reports_not_connected() {
        let (s, rx) = session();
        drop(rx);
        assert_eq!(s.delete_card("k1"), Err(BoardError::NotConnected));
    }
}
