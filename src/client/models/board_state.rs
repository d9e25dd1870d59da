use std::time::Duration;

use crate::client::models::entity_store::EntityStore;
use crate::client::services::presence::Presence;
use crate::client::services::standup::StandupSession;
use crate::client::services::timer::TimerMachine;
use crate::common::models::{Card, Column, User};

/// A column with its cards, as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub column: Column,
    pub cards: Vec<Card>,
}

/// Everything the client knows about one board. Built explicitly and handed to
/// the reducer; there is no global board state.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub current_user: Option<User>,
    pub store: EntityStore,
    pub presence: Presence,
    pub timer: TimerMachine,
    pub standup: StandupSession,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timer_dwell(dwell: Duration) -> Self {
        Self {
            timer: TimerMachine::new(dwell),
            ..Self::default()
        }
    }

    pub fn is_me(&self, user: &User) -> bool {
        self.current_user.as_ref().is_some_and(|me| me.id == user.id)
    }

    /// Columns in board order, each with the cards that point at it.
    pub fn projection(&self) -> Vec<ColumnView> {
        self.store
            .columns
            .items()
            .iter()
            .map(|column| ColumnView {
                column: column.clone(),
                cards: self
                    .store
                    .cards
                    .items()
                    .iter()
                    .filter(|card| card.column_id == column.id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Resolves a column by 1-based board position or by id.
    pub fn find_column(&self, key: &str) -> Option<&Column> {
        let columns = self.store.columns.items();
        match key.parse::<usize>() {
            Ok(pos) if pos >= 1 && pos <= columns.len() => columns.get(pos - 1),
            _ => self.store.columns.get(key),
        }
    }

    /// Resolves a card by 1-based position in the projection or by id.
    pub fn find_card(&self, key: &str) -> Option<&Card> {
        let by_position = key
            .parse::<usize>()
            .ok()
            .filter(|&pos| pos >= 1)
            .and_then(|pos| {
                self.projection()
                    .into_iter()
                    .flat_map(|view| view.cards)
                    .nth(pos - 1)
            });
        match by_position {
            Some(card) => self.store.cards.get(&card.id),
            None => self.store.cards.get(key),
        }
    }
}
