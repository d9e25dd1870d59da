use std::io::Write;
use std::time::Instant;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::config::ClientConfig;
use crate::client::models::board_state::BoardState;
use crate::client::models::messages::BoardEvent;
use crate::client::models::ui_state::FlashState;
use crate::client::services::board_service::BoardSession;
use crate::client::services::websocket_client::{ConnectionEvent, WebSocketClient, DISCONNECTED_NOTICE};
use crate::client::utils::session_store::save_display_name;
use crate::common::error::BoardError;
use crate::common::models::{TimerStatus, User};
use crate::common::protocol::ClientCommand;

pub const HELP: &str = "\
/board                          show columns and cards
/users                          who is on the board
/column add <name>              new column
/column rename <col> <name>     rename a column
/column del <col>               delete a column
/card add <col> <text>          new card
/card edit <card> <text>        change a card's text
/card move <card> <col>         move a card to another column
/card del <card>                delete a card
/vote <card> up|down            vote a card
/timer start <5m|30s|5m30s>     start the board timer
/timer pause|resume|stop
/standup start|next|close       run a stand-up
/standup pick <user>            hand the turn to someone
/name <new>                     change display name and reconnect
/help
/quit
Columns and cards can be given by their number in /board or by id.";

/// A parsed slash command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Board,
    Users,
    Help,
    Quit,
    ColumnAdd(String),
    ColumnRename { column: String, name: String },
    ColumnDelete(String),
    CardAdd { column: String, text: String },
    CardEdit { card: String, text: String },
    CardMove { card: String, column: String },
    CardDelete(String),
    Vote { card: String, vote: i32 },
    TimerStart(String),
    TimerPause,
    TimerResume,
    TimerStop,
    StandupStart,
    StandupNext,
    StandupPick(String),
    StandupClose,
    Rename(String),
}

// primo token e resto della riga, spazi interni preservati
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (s, ""),
    }
}

fn required<'a>(value: &'a str, usage: &str) -> Result<&'a str, String> {
    if value.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(value)
    }
}

pub fn parse_command(line: &str) -> Result<CliCommand, String> {
    let (command, rest) = split_word(line);
    match command {
        "/board" => Ok(CliCommand::Board),
        "/users" => Ok(CliCommand::Users),
        "/help" => Ok(CliCommand::Help),
        "/quit" => Ok(CliCommand::Quit),
        "/name" => Ok(CliCommand::Rename(required(rest, "/name <new>")?.to_string())),
        "/column" => {
            let (sub, args) = split_word(rest);
            match sub {
                "add" => Ok(CliCommand::ColumnAdd(required(args, "/column add <name>")?.to_string())),
                "rename" => {
                    let (column, name) = split_word(args);
                    let usage = "/column rename <col> <name>";
                    Ok(CliCommand::ColumnRename {
                        column: required(column, usage)?.to_string(),
                        name: required(name, usage)?.to_string(),
                    })
                }
                "del" | "delete" => Ok(CliCommand::ColumnDelete(required(args, "/column del <col>")?.to_string())),
                _ => Err("Usage: /column add|rename|del ...".to_string()),
            }
        }
        "/card" => {
            let (sub, args) = split_word(rest);
            let (target, tail) = split_word(args);
            match sub {
                "add" => {
                    let usage = "/card add <col> <text>";
                    Ok(CliCommand::CardAdd {
                        column: required(target, usage)?.to_string(),
                        text: required(tail, usage)?.to_string(),
                    })
                }
                "edit" => {
                    let usage = "/card edit <card> <text>";
                    Ok(CliCommand::CardEdit {
                        card: required(target, usage)?.to_string(),
                        text: required(tail, usage)?.to_string(),
                    })
                }
                "move" => {
                    let usage = "/card move <card> <col>";
                    Ok(CliCommand::CardMove {
                        card: required(target, usage)?.to_string(),
                        column: required(tail, usage)?.to_string(),
                    })
                }
                "del" | "delete" => Ok(CliCommand::CardDelete(required(target, "/card del <card>")?.to_string())),
                _ => Err("Usage: /card add|edit|move|del ...".to_string()),
            }
        }
        "/vote" => {
            let (card, direction) = split_word(rest);
            let card = required(card, "/vote <card> up|down")?.to_string();
            match direction {
                "up" | "+1" | "+" => Ok(CliCommand::Vote { card, vote: 1 }),
                "down" | "-1" | "-" => Ok(CliCommand::Vote { card, vote: -1 }),
                _ => Err("Usage: /vote <card> up|down".to_string()),
            }
        }
        "/timer" => {
            let (sub, args) = split_word(rest);
            match sub {
                "start" => Ok(CliCommand::TimerStart(required(args, "/timer start <5m|30s|5m30s>")?.to_string())),
                "pause" => Ok(CliCommand::TimerPause),
                "resume" => Ok(CliCommand::TimerResume),
                "stop" => Ok(CliCommand::TimerStop),
                _ => Err("Usage: /timer start <dur>|pause|resume|stop".to_string()),
            }
        }
        "/standup" => {
            let (sub, args) = split_word(rest);
            match sub {
                "start" => Ok(CliCommand::StandupStart),
                "next" => Ok(CliCommand::StandupNext),
                "pick" => Ok(CliCommand::StandupPick(required(args, "/standup pick <user>")?.to_string())),
                "close" => Ok(CliCommand::StandupClose),
                _ => Err("Usage: /standup start|next|pick <user>|close".to_string()),
            }
        }
        "" => Err("Type /help for the list of commands".to_string()),
        other => Err(format!("Unknown command {other}. Type /help")),
    }
}

pub fn render_board(state: &BoardState) -> String {
    let views = state.projection();
    if views.is_empty() {
        return "(no columns yet, try /column add <name>)".to_string();
    }
    let mut out = String::new();
    let mut card_no = 0;
    for (i, view) in views.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", i + 1, view.column.name));
        for card in &view.cards {
            card_no += 1;
            out.push_str(&format!("    {card_no}. {} ({:+})\n", card.name, card.votes));
        }
    }
    if state.timer.is_visible() {
        out.push_str(&format!("Timer: {} {}\n", state.timer.status().as_str(), state.timer.state().display));
    }
    out.trim_end().to_string()
}

pub fn render_users(state: &BoardState) -> String {
    let users = state.presence.users();
    if users.is_empty() {
        return "(nobody online)".to_string();
    }
    users
        .iter()
        .map(|user| {
            let mut line = user.name.clone();
            let tabs = state.presence.connection_count(&user.id);
            if tabs > 1 {
                line.push_str(&format!(" ×{tabs}"));
            }
            if state.is_me(user) {
                line.push_str(" (you)");
            }
            if state.standup.current().is_some_and(|c| c.id == user.id) {
                line.push_str(" 🎤");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn find_user<'a>(state: &'a BoardState, key: &str) -> Option<&'a User> {
    state
        .presence
        .users()
        .iter()
        .find(|u| u.id == key || u.name.eq_ignore_ascii_case(key))
}

fn stamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn say(text: &str) {
    println!("{} {}", stamp(), text);
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

struct Connection {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Connection {
    fn open(
        config: &ClientConfig,
        name: &str,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> anyhow::Result<(Self, mpsc::UnboundedSender<ClientCommand>)> {
        let client = WebSocketClient::from_config(config, name)?;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(client.run(events, outgoing_rx, shutdown_rx));
        Ok((Self { shutdown, task }, outgoing_tx))
    }

    async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("[CLIENT] connection task ended abnormally: {}", e);
        }
    }
}

struct Host {
    session: BoardSession,
    flash: FlashState,
    last_timer: TimerStatus,
}

impl Host {
    fn flash(&mut self, text: &str) {
        if self.flash.show(text, Instant::now()) {
            say(&format!("🔔 {}", text.trim()));
        }
    }

    fn present(&mut self, event: BoardEvent) {
        if let Some(text) = event.flash_text() {
            self.flash(&text);
            return;
        }
        match event {
            BoardEvent::Identified(user) => say(&format!("[CLIENT] Signed in as {}", user.name)),
            BoardEvent::PresenceChanged => {
                say(&format!("[BOARD] {} online", self.session.state().presence.user_count()))
            }
            BoardEvent::TimerUpdated(state) => {
                if state.status != self.last_timer {
                    self.last_timer = state.status;
                    say(&format!("[TIMER] {} {}", state.status.as_str(), state.display));
                }
            }
            BoardEvent::TimerDone => {
                print!("\x07");
                say("[TIMER] Time's up!");
            }
            BoardEvent::TimerCleared => {
                self.last_timer = TimerStatus::Stopped;
                debug!("[TIMER] back to stopped");
            }
            BoardEvent::ColumnsChanged | BoardEvent::CardsChanged => debug!("[BOARD] board changed"),
            BoardEvent::Notification(_) | BoardEvent::SpeakerTurn(_) => {}
        }
    }

    fn on_connection(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => debug!("[CLIENT] connected"),
            ConnectionEvent::Message(text) => {
                for event in self.session.deliver(&text, Instant::now()) {
                    self.present(event);
                }
            }
            ConnectionEvent::Disconnected { reason } => {
                debug!("[CLIENT] disconnected: {}", reason);
                self.flash(DISCONNECTED_NOTICE);
            }
            ConnectionEvent::Reconnecting { delay } => debug!("[CLIENT] reconnecting in {:?}", delay),
        }
    }

    fn column_id(&self, key: &str) -> Result<String, BoardError> {
        self.session
            .state()
            .find_column(key)
            .map(|c| c.id.clone())
            .ok_or_else(|| BoardError::UnknownColumn(key.to_string()))
    }

    fn card_id(&self, key: &str) -> Result<String, BoardError> {
        self.session
            .state()
            .find_card(key)
            .map(|c| c.id.clone())
            .ok_or_else(|| BoardError::UnknownCard(key.to_string()))
    }

    fn execute(&mut self, command: CliCommand) -> Result<(), BoardError> {
        match command {
            CliCommand::Board => println!("{}", render_board(self.session.state())),
            CliCommand::Users => println!("{}", render_users(self.session.state())),
            CliCommand::Help => println!("{HELP}"),
            CliCommand::ColumnAdd(name) => self.session.create_column(&name)?,
            CliCommand::ColumnRename { column, name } => {
                let id = self.column_id(&column)?;
                self.session.rename_column(&id, &name)?
            }
            CliCommand::ColumnDelete(column) => {
                let id = self.column_id(&column)?;
                self.session.delete_column(&id)?
            }
            CliCommand::CardAdd { column, text } => {
                let id = self.column_id(&column)?;
                self.session.create_card(&id, &text)?
            }
            CliCommand::CardEdit { card, text } => {
                let id = self.card_id(&card)?;
                self.session.edit_card(&id, &text)?
            }
            CliCommand::CardMove { card, column } => {
                let card_id = self.card_id(&card)?;
                let column_id = self.column_id(&column)?;
                if !self.session.move_card(&card_id, &column_id)? {
                    println!("[CLIENT] Card is already in that column");
                }
            }
            CliCommand::CardDelete(card) => {
                let id = self.card_id(&card)?;
                self.session.delete_card(&id)?
            }
            CliCommand::Vote { card, vote } => {
                let id = self.card_id(&card)?;
                self.session.vote_card(&id, vote)?
            }
            CliCommand::TimerStart(value) => {
                if !self.session.start_timer(&value)? {
                    println!("[CLIENT] The timer is already running");
                }
            }
            CliCommand::TimerPause => {
                self.session.pause_timer()?;
            }
            CliCommand::TimerResume => {
                self.session.resume_timer()?;
            }
            CliCommand::TimerStop => {
                self.session.stop_timer()?;
            }
            CliCommand::StandupStart => {
                let turn = self.session.start_standup()?;
                self.flash(&turn.announcement());
            }
            CliCommand::StandupNext => match self.session.next_speaker()? {
                Some(turn) => self.flash(&turn.announcement()),
                None => println!("[CLIENT] Everybody has spoken"),
            },
            CliCommand::StandupPick(key) => {
                let user_id = find_user(self.session.state(), &key)
                    .map(|u| u.id.clone())
                    .ok_or_else(|| BoardError::UnknownParticipant(key.clone()))?;
                let turn = self.session.select_speaker(&user_id)?;
                self.flash(&turn.announcement());
            }
            CliCommand::StandupClose => {
                self.session.close_standup();
                println!("[CLIENT] Stand-up closed");
            }
            // handled by the loop, they touch the connection
            CliCommand::Quit | CliCommand::Rename(_) => {}
        }
        Ok(())
    }
}

/// Interactive terminal client: one loop owns the board, the connection task
/// feeds it frames, stdin feeds it commands.
pub async fn run(config: ClientConfig, name: String) -> anyhow::Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut name = name;
    let (mut connection, outgoing) = Connection::open(&config, &name, events_tx.clone())?;

    let mut session = BoardSession::with_timer_dwell(config.timer_dwell, outgoing);
    session.set_max_columns(config.max_columns);
    let mut host = Host {
        session,
        flash: FlashState::new(config.notification_timeout),
        last_timer: TimerStatus::Stopped,
    };

    println!("[CLIENT] Welcome {name}! Type /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        let deadline = host.session.next_deadline();
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => host.on_connection(event),
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    prompt();
                    continue;
                }
                match parse_command(&line) {
                    Ok(CliCommand::Quit) => break,
                    Ok(CliCommand::Rename(new_name)) => {
                        let new_name = new_name.trim().to_string();
                        if let Err(e) = save_display_name(&new_name) {
                            warn!("[CLIENT] display name not saved: {}", e);
                        }
                        connection.close().await;
                        let (reopened, outgoing) = Connection::open(&config, &new_name, events_tx.clone())?;
                        connection = reopened;
                        host.session.set_outgoing(outgoing);
                        println!("[CLIENT] Reconnecting as {new_name}");
                        name = new_name;
                    }
                    Ok(command) => {
                        if let Err(e) = host.execute(command) {
                            println!("[CLIENT] {e}");
                        }
                    }
                    Err(usage) => println!("[CLIENT] {usage}"),
                }
                prompt();
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now).into()), if deadline.is_some() => {
                for event in host.session.tick(Instant::now()) {
                    host.present(event);
                }
            }
        }
    }

    println!("[CLIENT] Bye {name}");
    connection.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::models::{Card, Column};
    use crate::common::protocol::ChangeOp;

    #[test]
    fn parses_board_commands() {
        assert_eq!(parse_command("/column add  Went well "), Ok(CliCommand::ColumnAdd("Went well".into())));
        assert_eq!(
            parse_command("/card add 2 Fix the flaky build"),
            Ok(CliCommand::CardAdd { column: "2".into(), text: "Fix the flaky build".into() })
        );
        assert_eq!(
            parse_command("/card move 3 1"),
            Ok(CliCommand::CardMove { card: "3".into(), column: "1".into() })
        );
        assert_eq!(parse_command("/vote k1 down"), Ok(CliCommand::Vote { card: "k1".into(), vote: -1 }));
        assert_eq!(parse_command("/timer start 5m30s"), Ok(CliCommand::TimerStart("5m30s".into())));
        assert_eq!(parse_command("/standup pick Bob"), Ok(CliCommand::StandupPick("Bob".into())));
        assert_eq!(parse_command("/quit"), Ok(CliCommand::Quit));
    }

    #[test]
    fn rejects_incomplete_commands() {
        assert!(parse_command("/column add").is_err());
        assert!(parse_command("/card edit 1").is_err());
        assert!(parse_command("/vote 1 sideways").is_err());
        assert!(parse_command("/timer").is_err());
        assert!(parse_command("hello").is_err());
    }

    #[test]
    fn board_listing_numbers_cards_across_columns() {
        let mut state = BoardState::new();
        state.store.columns.apply(ChangeOp::put(
            "c1",
            Column { id: "c1".into(), name: "To Do".into(), created_at: 1 },
        ));
        state.store.cards.apply(ChangeOp::put(
            "k1",
            Card { id: "k1".into(), name: "Ship it".into(), column_id: "c1".into(), created_at: 2, votes: 2 },
        ));

        let out = render_board(&state);
        assert!(out.contains("[1] To Do"));
        assert!(out.contains("1. Ship it (+2)"));
        assert!(!out.contains("Timer"));
    }
}
