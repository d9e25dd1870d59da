use log::warn;

use crate::common::models::{Card, Client, Column};
use crate::common::protocol::{ChangeOp, Op};

/// Record held by a [`Collection`]: keyed by id and ordered by creation time.
pub trait Entity: Clone {
    fn id(&self) -> &str;
    fn created_at(&self) -> i64;
}

impl Entity for Column {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl Entity for Card {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl Entity for Client {
    fn id(&self) -> &str {
        &self.id
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Ordered list of entities, kept sorted by `created_at` (stable on ties).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one change operation. Returns `true` when the collection changed.
    ///
    /// A `put` for a known id replaces the element where it sits, an unknown id is
    /// appended; both re-sort afterwards. A `delete` for an unknown id is a no-op,
    /// so redelivered operations are harmless.
    pub fn apply(&mut self, change: ChangeOp<T>) -> bool {
        match change.op {
            Op::Put => match change.obj {
                Some(obj) if obj.id() != change.id => {
                    warn!("[BOARD] put for {} carries object {}, ignored", change.id, obj.id());
                    false
                }
                Some(obj) => {
                    self.put(change.id, obj);
                    true
                }
                None => {
                    warn!("[BOARD] put for {} without an object, ignored", change.id);
                    false
                }
            },
            Op::Delete => self.delete(&change.id),
        }
    }

    pub fn put(&mut self, id: String, obj: T) {
        match self.items.iter().position(|item| item.id() == id) {
            Some(idx) => self.items[idx] = obj,
            None => self.items.push(obj),
        }
        self.sort();
    }

    pub fn delete(&mut self, id: &str) -> bool {
        match self.items.iter().position(|item| item.id() == id) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Replaces every element at once (legacy full-roster pushes).
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        self.sort();
    }

    fn sort(&mut self) {
        // sort_by_key is stable: equal timestamps keep their relative order
        self.items.sort_by_key(|item| item.created_at());
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Owns the three shared collections. Only the reducer writes to it.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub columns: Collection<Column>,
    pub cards: Collection<Card>,
    pub clients: Collection<Client>,
}
