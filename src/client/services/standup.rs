use log::info;
use rand::Rng;

use crate::common::error::BoardError;
use crate::common::models::User;

/// Source of uniform picks for the shuffle. Any `rand::Rng` is one; tests can
/// script the picks to get exact permutations.
pub trait ShuffleSource {
    /// Uniform index in `0..=upper`.
    fn pick_index(&mut self, upper: usize) -> usize;
}

impl<R: Rng + ?Sized> ShuffleSource for R {
    fn pick_index(&mut self, upper: usize) -> usize {
        self.gen_range(0..=upper)
    }
}

/// Fisher-Yates, walking from the last slot down to 1.
pub fn shuffle<T, S: ShuffleSource + ?Sized>(items: &mut [T], source: &mut S) {
    for i in (1..items.len()).rev() {
        let j = source.pick_index(i);
        items.swap(i, j);
    }
}

/// Whose turn it is, as announced to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTurn {
    pub user: User,
    /// The speaker sits at the head of the rotation.
    pub first: bool,
}

impl SpeakerTurn {
    pub fn announcement(&self) -> String {
        if self.first {
            format!("{} the lucky first 🥇", self.user.name)
        } else {
            format!("{}'s turn!", self.user.name)
        }
    }
}

/// Stand-up rotation: a randomized speaker order that follows the participants
/// joining and leaving while the session runs.
#[derive(Debug, Clone, Default)]
pub struct StandupSession {
    order: Vec<User>,
    current: Option<String>,
    active: bool,
}

impl StandupSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn order(&self) -> &[User] {
        &self.order
    }

    pub fn order_ids(&self) -> Vec<&str> {
        self.order.iter().map(|u| u.id.as_str()).collect()
    }

    pub fn current(&self) -> Option<&User> {
        let current = self.current.as_deref()?;
        self.order.iter().find(|u| u.id == current)
    }

    pub fn start<S: ShuffleSource + ?Sized>(
        &mut self,
        participants: &[User],
        source: &mut S,
    ) -> Result<SpeakerTurn, BoardError> {
        if self.active {
            return Err(BoardError::StandupActive);
        }
        if participants.len() < 2 {
            return Err(BoardError::NotEnoughParticipants);
        }

        let mut order = participants.to_vec();
        shuffle(&mut order, source);
        let first = order[0].clone();

        self.order = order;
        self.current = Some(first.id.clone());
        self.active = true;
        info!("[STANDUP] started with {} participant(s)", self.order.len());

        Ok(SpeakerTurn {
            user: first,
            first: true,
        })
    }

    /// Brings the rotation in line with the live participants: newcomers go to the
    /// end, departed users are dropped, nobody else moves. When the current speaker
    /// leaves, the turn passes to whoever followed them (wrapping to the head); the
    /// returned turn is that hand-over. When the rotation had emptied out, the
    /// head of the rebuilt order becomes the speaker.
    pub fn reconcile(&mut self, participants: &[User]) -> Option<SpeakerTurn> {
        if !self.active {
            return None;
        }

        let removed_at = self
            .current
            .as_deref()
            .and_then(|id| self.order.iter().position(|u| u.id == id))
            .filter(|&idx| !participants.iter().any(|p| p.id == self.order[idx].id));

        // survivors before the departed speaker, to locate the hand-over
        let survivors_before = removed_at.map(|idx| {
            self.order[..idx]
                .iter()
                .filter(|u| participants.iter().any(|p| p.id == u.id))
                .count()
        });

        self.order.retain(|u| participants.iter().any(|p| p.id == u.id));
        for p in participants {
            if !self.order.iter().any(|u| u.id == p.id) {
                self.order.push(p.clone());
            }
        }

        let Some(survivors_before) = survivors_before else {
            // everyone had left; the first one back picks the rotation up
            if self.current.is_none() && !self.order.is_empty() {
                let user = self.order[0].clone();
                self.current = Some(user.id.clone());
                info!("[STANDUP] rotation resumes with {}", user.name);
                return Some(SpeakerTurn { user, first: true });
            }
            return None;
        };
        if self.order.is_empty() {
            self.current = None;
            info!("[STANDUP] everyone left the rotation");
            return None;
        }

        let next_idx = if survivors_before < self.order.len() {
            survivors_before
        } else {
            0
        };
        let user = self.order[next_idx].clone();
        self.current = Some(user.id.clone());
        info!("[STANDUP] current speaker left, passing to {}", user.name);
        Some(SpeakerTurn {
            first: next_idx == 0,
            user,
        })
    }

    /// Picks the speaker explicitly.
    pub fn advance(&mut self, user_id: &str) -> Result<SpeakerTurn, BoardError> {
        if !self.active {
            return Err(BoardError::StandupInactive);
        }
        let idx = self
            .order
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| BoardError::UnknownParticipant(user_id.to_string()))?;

        let user = self.order[idx].clone();
        self.current = Some(user.id.clone());
        Ok(SpeakerTurn {
            first: idx == 0,
            user,
        })
    }

    /// Moves to the participant after the current one. `None` once the last
    /// speaker is done.
    pub fn next(&mut self) -> Result<Option<SpeakerTurn>, BoardError> {
        if !self.active {
            return Err(BoardError::StandupInactive);
        }
        let next_idx = match self
            .current
            .as_deref()
            .and_then(|id| self.order.iter().position(|u| u.id == id))
        {
            Some(idx) => idx + 1,
            None => 0,
        };
        match self.order.get(next_idx) {
            Some(user) => {
                let user_id = user.id.clone();
                self.advance(&user_id).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn close(&mut self) {
        self.order.clear();
        self.current = None;
        self.active = false;
        info!("[STANDUP] closed");
    }
}
