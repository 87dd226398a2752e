use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Set of URL keys already taken by some crawl task.
///
/// The only way in is [`VisitedRegistry::try_claim`], which checks and inserts
/// under one lock so two tasks can never both own the same key.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    keys: Mutex<HashSet<String>>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the caller is the first to claim `key`.
    pub fn try_claim(&self, key: &str) -> bool {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if keys.contains(key) {
            return false;
        }
        keys.insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
