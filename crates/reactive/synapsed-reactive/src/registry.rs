//! Concurrent token → callback registry owned by each subject

use crate::callback::Callback;
use crate::types::Token;
use dashmap::DashMap;

/// Subscription registry safe for concurrent insert, remove and iteration.
///
/// Snapshots copy the entries out before returning, so callbacks run by the
/// caller may freely mutate the registry they were taken from.
#[derive(Debug, Default)]
pub struct Registry {
    entries: DashMap<Token, Callback>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `callback` under `token`, returning a callback it replaced
    pub fn insert(&self, token: Token, callback: Callback) -> Option<Callback> {
        self.entries.insert(token, callback)
    }

    pub fn remove(&self, token: &Token) -> bool {
        self.entries.remove(token).is_some()
    }

    pub fn lookup(&self, token: &Token) -> Option<Callback> {
        self.entries.get(token).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.entries.contains_key(token)
    }

    /// Copy of the current entries; later mutations are not reflected
    pub fn snapshot(&self) -> Vec<(Token, Callback)> {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
