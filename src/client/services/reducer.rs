use std::time::Instant;

use log::{debug, warn};

use crate::client::models::board_state::BoardState;
use crate::client::models::messages::BoardEvent;
use crate::common::protocol::{decode, decode_value, ServerMessage};

/// Replays the server's messages onto a [`BoardState`], one at a time and in
/// receipt order. Batches are unpacked and applied entry by entry, so a later
/// operation on the same id wins over an earlier one.
pub struct ChangeLogReducer;

impl ChangeLogReducer {
    /// Decodes and applies one raw frame. Frames that do not parse are dropped.
    pub fn handle_raw(state: &mut BoardState, text: &str, now: Instant) -> Vec<BoardEvent> {
        match decode(text) {
            Ok(msg) => Self::handle(state, msg, now),
            Err(e) => {
                warn!("[BOARD] dropping malformed message: {}", e);
                Vec::new()
            }
        }
    }

    pub fn handle(state: &mut BoardState, msg: ServerMessage, now: Instant) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        Self::apply(state, msg, now, &mut events);
        events
    }

    fn apply(state: &mut BoardState, msg: ServerMessage, now: Instant, events: &mut Vec<BoardEvent>) {
        match msg {
            ServerMessage::Me { user } => {
                debug!("[BOARD] identified as {} ({})", user.name, user.id);
                state.current_user = Some(user.clone());
                events.push(BoardEvent::Identified(user));
            }
            ServerMessage::Columns(change) => {
                if state.store.columns.apply(change) {
                    events.push(BoardEvent::ColumnsChanged);
                }
            }
            ServerMessage::Cards(change) => {
                if state.store.cards.apply(change) {
                    events.push(BoardEvent::CardsChanged);
                }
            }
            ServerMessage::Clients(change) => {
                if state.store.clients.apply(change) {
                    Self::refresh_presence(state, events);
                }
            }
            ServerMessage::BoardUsers { data } => {
                state.store.clients.replace_all(data);
                Self::refresh_presence(state, events);
            }
            ServerMessage::Notification { data, user } => {
                // the originator already knows what they did
                match (&state.current_user, user) {
                    (Some(me), Some(from)) if me.id != from.id => {
                        events.push(BoardEvent::Notification(data));
                    }
                    _ => debug!("[BOARD] notification suppressed: {}", data),
                }
            }
            ServerMessage::Timer { data } => {
                let transition = state.timer.apply(data.clone(), now);
                events.push(BoardEvent::TimerUpdated(data));
                if transition.entered_done {
                    events.push(BoardEvent::TimerDone);
                }
            }
            ServerMessage::Batch { messages } => {
                debug!("[BOARD] replaying batch of {}", messages.len());
                for raw in messages {
                    match decode_value(raw) {
                        Ok(inner) => Self::apply(state, inner, now, events),
                        Err(e) => warn!("[BOARD] dropping malformed batch entry: {}", e),
                    }
                }
            }
            ServerMessage::Unknown => debug!("[BOARD] ignoring unknown message type"),
        }
    }

    fn refresh_presence(state: &mut BoardState, events: &mut Vec<BoardEvent>) {
        if !state.presence.recompute(state.store.clients.items()) {
            return;
        }
        events.push(BoardEvent::PresenceChanged);
        if let Some(turn) = state.standup.reconcile(state.presence.users()) {
            events.push(BoardEvent::SpeakerTurn(turn));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::services::standup::ShuffleSource;
    use crate::common::models::TimerStatus;
    use serde_json::json;

    struct Identity;

    impl ShuffleSource for Identity {
        fn pick_index(&mut self, upper: usize) -> usize {
            upper
        }
    }

    fn feed(state: &mut BoardState, value: serde_json::Value) -> Vec<BoardEvent> {
        ChangeLogReducer::handle_raw(state, &value.to_string(), Instant::now())
    }

    fn client_put(conn: &str, user: &str, at: i64) -> serde_json::Value {
        json!({"type": "clients", "op": "put", "id": conn,
               "obj": {"id": conn, "user": {"id": user, "name": user}, "created_at": at}})
    }

    #[test]
    fn batch_applies_in_array_order() {
        let mut state = BoardState::new();
        let events = feed(
            &mut state,
            json!({"type": "messages", "messages": [
                {"type": "columns", "op": "put", "id": "A", "obj": {"id": "A", "name": "v1", "created_at": 1}},
                {"type": "columns", "op": "put", "id": "A", "obj": {"id": "A", "name": "v2", "created_at": 1}},
            ]}),
        );

        assert_eq!(events, vec![BoardEvent::ColumnsChanged, BoardEvent::ColumnsChanged]);
        assert_eq!(state.store.columns.len(), 1);
        assert_eq!(state.store.columns.get("A").unwrap().name, "v2");
    }

    #[test]
    fn batch_put_then_delete_leaves_nothing() {
        let mut state = BoardState::new();
        feed(
            &mut state,
            json!({"type": "messages", "messages": [
                {"type": "cards", "op": "put", "id": "k", "obj": {"id": "k", "name": "x", "column_id": "c"}},
                {"type": "not-a-real-type"},
                42,
                {"type": "cards", "op": "del", "id": "k"},
            ]}),
        );
        assert!(state.store.cards.is_empty());
    }

    #[test]
    fn malformed_and_unknown_messages_are_noops() {
        let mut state = BoardState::new();
        assert!(ChangeLogReducer::handle_raw(&mut state, "{oops", Instant::now()).is_empty());
        assert!(feed(&mut state, json!({"type": "board.status", "data": {}})).is_empty());
        assert!(feed(&mut state, json!({"type": "cards", "op": "del", "id": "missing"})).is_empty());
        assert!(state.store.cards.is_empty());
    }

    #[test]
    fn notifications_from_self_are_suppressed() {
        let mut state = BoardState::new();
        let note = |from: &str| json!({"type": "board.notification", "data": "card added", "user": {"id": from}});

        // nothing surfaces before identification
        assert!(feed(&mut state, note("u2")).is_empty());

        feed(&mut state, json!({"type": "me", "user": {"id": "u1", "name": "alice"}}));
        assert!(feed(&mut state, note("u1")).is_empty());
        assert_eq!(
            feed(&mut state, note("u2")),
            vec![BoardEvent::Notification("card added".into())]
        );
    }

    #[test]
    fn clients_feed_presence() {
        let mut state = BoardState::new();
        assert_eq!(feed(&mut state, client_put("c1", "u1", 1)), vec![BoardEvent::PresenceChanged]);
        // second tab: same roster, no presence event
        assert!(feed(&mut state, client_put("c2", "u1", 2)).is_empty());

        assert_eq!(state.presence.user_count(), 1);
        assert_eq!(state.presence.connection_count("u1"), 2);
    }

    #[test]
    fn legacy_roster_replaces_clients() {
        let mut state = BoardState::new();
        feed(&mut state, client_put("old", "u9", 1));
        feed(
            &mut state,
            json!({"type": "board.users", "data": [
                {"id": "c2", "user": {"id": "u2", "name": "bob"}, "joined_at": 5},
                {"id": "c1", "user": {"id": "u1", "name": "amy"}, "joined_at": 3},
            ]}),
        );

        let ids: Vec<&str> = state.presence.users().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert!(state.store.clients.get("old").is_none());
    }

    #[test]
    fn roster_changes_reconcile_running_standup() {
        let mut state = BoardState::new();
        feed(&mut state, client_put("c1", "u1", 1));
        feed(&mut state, client_put("c2", "u2", 2));
        let users = state.presence.users().to_vec();
        state.standup.start(&users, &mut Identity).unwrap();
        assert_eq!(state.standup.current().unwrap().id, "u1");

        feed(&mut state, client_put("c3", "u3", 3));
        assert_eq!(state.standup.order_ids(), vec!["u1", "u2", "u3"]);

        let events = feed(&mut state, json!({"type": "clients", "op": "del", "id": "c1"}));
        assert_eq!(state.standup.order_ids(), vec!["u2", "u3"]);
        assert!(matches!(
            events.as_slice(),
            [BoardEvent::PresenceChanged, BoardEvent::SpeakerTurn(turn)] if turn.user.id == "u2"
        ));
    }

    #[test]
    fn timer_done_rings_once() {
        let mut state = BoardState::new();
        let done = json!({"type": "timer.state", "data": {"status": "done", "display": "00:00"}});

        let events = feed(&mut state, done.clone());
        assert!(events.contains(&BoardEvent::TimerDone));
        assert_eq!(state.timer.status(), TimerStatus::Done);

        let events = feed(&mut state, done);
        assert!(!events.contains(&BoardEvent::TimerDone));
    }
}
