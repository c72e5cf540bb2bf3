//! Chat session identifiers and a bounded in-memory history store.
//!
//! Sessions expire after a period of inactivity, the store holds a fixed
//! number of sessions (the least recently touched one is evicted first), and
//! each session keeps only its most recent turns.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;

const SESSION_ID_LEN: usize = 16;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 64;
pub const DEFAULT_MAX_TURNS: usize = 100;

/// Opaque conversation identifier sent with every chat request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Random 16-character alphanumeric id.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    turns: VecDeque<ChatTurn>,
    last_touched: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    max_sessions: usize,
    max_turns: usize,
    entries: HashMap<SessionId, Entry>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS, DEFAULT_MAX_TURNS)
    }
}

impl SessionStore {
    /// `max_sessions` and `max_turns` are raised to at least 1.
    pub fn new(ttl: Duration, max_sessions: usize, max_turns: usize) -> Self {
        Self {
            ttl,
            max_sessions: max_sessions.max(1),
            max_turns: max_turns.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn append(&mut self, id: &SessionId, turn: ChatTurn) {
        self.append_at(id, turn, Instant::now());
    }

    pub fn append_at(&mut self, id: &SessionId, turn: ChatTurn, now: Instant) {
        self.evict_expired(now);
        if !self.entries.contains_key(id) && self.entries.len() >= self.max_sessions {
            self.evict_oldest();
        }

        let entry = self.entries.entry(id.clone()).or_insert_with(|| Entry {
            turns: VecDeque::new(),
            last_touched: now,
        });
        entry.turns.push_back(turn);
        while entry.turns.len() > self.max_turns {
            entry.turns.pop_front();
        }
        entry.last_touched = now;
    }

    /// Turns of a live session, oldest first. Reading counts as activity.
    pub fn history(&mut self, id: &SessionId) -> Vec<ChatTurn> {
        self.history_at(id, Instant::now())
    }

    pub fn history_at(&mut self, id: &SessionId, now: Instant) -> Vec<ChatTurn> {
        self.evict_expired(now);
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.last_touched = now;
                entry.turns.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn remove(&mut self, id: &SessionId) {
        self.entries.remove(id);
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.last_touched) < ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "expired chat sessions");
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_touched)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            debug!(session = %id, "evicting least recently used chat session");
            self.entries.remove(&id);
        }
    }
}
