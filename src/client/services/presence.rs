use std::collections::HashMap;

use crate::common::models::{Client, User};

/// Roster derived from the raw Client collection.
///
/// A user is listed once no matter how many connections they hold, ordered by the
/// joined-at time of the first connection seen for them. That position survives
/// the first connection going away while another one is still open, and does not
/// move when an extra tab joins.
#[derive(Debug, Clone, Default)]
pub struct Presence {
    users: Vec<User>,
    connection_count: HashMap<String, usize>,
    first_seen: HashMap<String, i64>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the roster from the current clients. Returns `true` when the set
    /// or order of user ids changed.
    pub fn recompute(&mut self, clients: &[Client]) -> bool {
        let previous: Vec<String> = self.users.iter().map(|u| u.id.clone()).collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut users: Vec<User> = Vec::new();
        for client in clients {
            let count = counts.entry(client.user.id.clone()).or_insert(0);
            if *count == 0 {
                users.push(client.user.clone());
            }
            *count += 1;

            let seen = self
                .first_seen
                .entry(client.user.id.clone())
                .or_insert(client.created_at);
            if client.created_at < *seen {
                *seen = client.created_at;
            }
        }

        // a user who dropped every connection starts over when they come back
        self.first_seen.retain(|id, _| counts.contains_key(id));

        let first_seen = &self.first_seen;
        users.sort_by_key(|u| first_seen.get(&u.id).copied().unwrap_or(i64::MAX));

        self.users = users;
        self.connection_count = counts;

        let changed = self.users.len() != previous.len()
            || self.users.iter().zip(previous.iter()).any(|(u, id)| &u.id != id);
        if changed {
            log::debug!("[BOARD] presence now {} user(s)", self.users.len());
        }
        changed
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn connection_count(&self, user_id: &str) -> usize {
        self.connection_count.get(user_id).copied().unwrap_or(0)
    }

    pub fn is_present(&self, user_id: &str) -> bool {
        self.connection_count(user_id) >= 1
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
