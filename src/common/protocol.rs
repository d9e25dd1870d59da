use serde::{Deserialize, Serialize};

use crate::common::models::{Card, Client, Column, TimerState, User};

/// Operazione di modifica emessa dal server per una collezione
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "put")]
    Put,
    #[serde(rename = "del", alias = "delete")]
    Delete,
}

/// One entry of the server's change log, keyed by entity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOp<T> {
    pub op: Op,
    pub id: String,
    pub obj: Option<T>,
}

impl<T> ChangeOp<T> {
    pub fn put(id: impl Into<String>, obj: T) -> Self {
        Self {
            op: Op::Put,
            id: id.into(),
            obj: Some(obj),
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            op: Op::Delete,
            id: id.into(),
            obj: None,
        }
    }
}

/// Messaggi in arrivo dal server, distinti dal campo `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "me")]
    Me { user: User },
    #[serde(rename = "columns")]
    Columns(ChangeOp<Column>),
    #[serde(rename = "cards")]
    Cards(ChangeOp<Card>),
    #[serde(rename = "clients")]
    Clients(ChangeOp<Client>),
    /// Legacy roster push: the whole Client collection at once.
    #[serde(rename = "board.users")]
    BoardUsers { data: Vec<Client> },
    #[serde(rename = "board.notification")]
    Notification { data: String, user: Option<User> },
    #[serde(rename = "timer.state")]
    Timer { data: TimerState },
    /// Batch wrapper. Inner messages are decoded one by one so a single
    /// malformed entry does not poison the rest of the batch.
    #[serde(rename = "messages")]
    Batch { messages: Vec<serde_json::Value> },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerCmdKind {
    Start,
    Pause,
    Stop,
}

/// Comandi inviati al server (fire-and-forget)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    #[serde(rename = "me")]
    Me,
    #[serde(rename = "column.new")]
    ColumnNew { name: String },
    #[serde(rename = "column.update")]
    ColumnUpdate(Column),
    #[serde(rename = "column.delete")]
    ColumnDelete { id: String },
    #[serde(rename = "card.new")]
    CardNew { name: String, column_id: String },
    #[serde(rename = "card.update")]
    CardUpdate(Card),
    #[serde(rename = "card.delete")]
    CardDelete { id: String },
    #[serde(rename = "card.vote")]
    CardVote { id: String, vote: i32 },
    #[serde(rename = "timer.cmd")]
    TimerCmd {
        cmd: TimerCmdKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl ClientCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::Me => "me",
            ClientCommand::ColumnNew { .. } => "column.new",
            ClientCommand::ColumnUpdate(_) => "column.update",
            ClientCommand::ColumnDelete { .. } => "column.delete",
            ClientCommand::CardNew { .. } => "card.new",
            ClientCommand::CardUpdate(_) => "card.update",
            ClientCommand::CardDelete { .. } => "card.delete",
            ClientCommand::CardVote { .. } => "card.vote",
            ClientCommand::TimerCmd { .. } => "timer.cmd",
        }
    }
}

pub fn decode(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn decode_value(value: serde_json::Value) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_value(value)
}

pub fn encode(command: &ClientCommand) -> Result<String, serde_json::Error> {
    serde_json::to_string(command)
}
