use std::time::{Duration, Instant};

use retroboard::client::models::messages::BoardEvent;
use retroboard::client::services::standup::ShuffleSource;
use retroboard::common::protocol::ClientCommand;
use retroboard::{BoardError, BoardSession};
use serde_json::json;
use tokio::sync::mpsc;

/// Keeps the presence order as the rotation.
struct InOrder;

impl ShuffleSource for InOrder {
    fn pick_index(&mut self, upper: usize) -> usize {
        upper
    }
}

fn session() -> (BoardSession, mpsc::UnboundedReceiver<ClientCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BoardSession::new(tx), rx)
}

fn push(session: &mut BoardSession, value: serde_json::Value) -> Vec<BoardEvent> {
    session.deliver(&value.to_string(), Instant::now())
}

fn join(session: &mut BoardSession, conn: &str, user: &str, name: &str, at: i64) -> Vec<BoardEvent> {
    push(
        session,
        json!({"type": "clients", "op": "put", "id": conn,
               "obj": {"id": conn, "user": {"id": user, "name": name}, "created_at": at}}),
    )
}

#[test]
fn alice_sees_her_first_card() {
    let (mut session, _rx) = session();

    let events = push(&mut session, json!({"type": "me", "user": {"id": "u1", "name": "alice"}}));
    assert!(matches!(events.as_slice(), [BoardEvent::Identified(user)] if user.id == "u1"));

    push(
        &mut session,
        json!({"type": "columns", "op": "put", "id": "c1", "obj": {"id": "c1", "name": "To Do", "created_at": 1}}),
    );
    push(
        &mut session,
        json!({"type": "cards", "op": "put", "id": "k1",
               "obj": {"id": "k1", "column_id": "c1", "name": "Ship it", "created_at": 2}}),
    );

    let views = session.state().projection();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].column.name, "To Do");
    assert_eq!(views[0].cards.len(), 1);
    assert_eq!(views[0].cards[0].name, "Ship it");
}

#[test]
fn replayed_snapshot_after_reconnect_is_idempotent() {
    let (mut session, _rx) = session();
    let snapshot = json!({"type": "messages", "messages": [
        {"type": "columns", "op": "put", "id": "c1", "obj": {"id": "c1", "name": "To Do", "created_at": 1}},
        {"type": "columns", "op": "put", "id": "c2", "obj": {"id": "c2", "name": "Done", "created_at": 2}},
        {"type": "cards", "op": "put", "id": "k1", "obj": {"id": "k1", "column_id": "c2", "name": "x", "created_at": 3}},
    ]});

    push(&mut session, snapshot.clone());
    let before = session.state().projection();
    push(&mut session, snapshot);
    assert_eq!(session.state().projection(), before);
}

#[test]
fn standup_follows_people_leaving() {
    let (mut session, _rx) = session();
    push(&mut session, json!({"type": "me", "user": {"id": "u1", "name": "alice"}}));
    join(&mut session, "c1", "u1", "alice", 1);
    join(&mut session, "c2", "u2", "bob", 2);
    join(&mut session, "c3", "u3", "carol", 3);

    let turn = session.start_standup_with(&mut InOrder).unwrap();
    assert_eq!(turn.announcement(), "alice the lucky first 🥇");

    let turn = session.next_speaker().unwrap().unwrap();
    assert_eq!(turn.announcement(), "bob's turn!");

    // bob closes his tab: the turn moves on to carol
    let events = push(&mut session, json!({"type": "clients", "op": "del", "id": "c2"}));
    let flashes: Vec<String> = events.iter().filter_map(|e| e.flash_text()).collect();
    assert_eq!(flashes, vec!["carol's turn!".to_string()]);

    assert_eq!(session.next_speaker().unwrap(), None);
    session.close_standup();
    assert_eq!(session.next_speaker(), Err(BoardError::StandupInactive));
}

#[test]
fn timer_cycle_with_local_dwell() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = BoardSession::with_timer_dwell(Duration::from_secs(5), tx);
    let t0 = Instant::now();

    assert!(session.start_timer("1m").unwrap());
    rx.try_recv().unwrap();

    let running = json!({"type": "timer.state", "data": {"status": "running", "display": "01:00"}});
    session.deliver(&running.to_string(), t0);
    assert!(session.pause_timer().unwrap());
    rx.try_recv().unwrap();

    let done = json!({"type": "timer.state", "data": {"status": "done", "display": "00:00"}});
    let events = session.deliver(&done.to_string(), t0);
    assert!(events.contains(&BoardEvent::TimerDone));

    let deadline = session.next_deadline().unwrap();
    assert_eq!(session.tick(deadline), vec![BoardEvent::TimerCleared]);
    assert_eq!(session.state().timer.state().display, "00:00");
    assert!(rx.try_recv().is_err());
}
