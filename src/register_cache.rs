use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Register address -> raw word from one successful poll.
pub type RawReading = BTreeMap<u16, u16>;

/// The view every consumer reads from. Never mutated once published.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachedState {
    /// Last fully successful poll; empty until the first one.
    pub last_good_reading: RawReading,
    /// Outcome of the most recent poll.
    pub connection_healthy: bool,
}

impl CachedState {
    pub fn has_data(&self) -> bool {
        !self.last_good_reading.is_empty()
    }

    pub fn raw(&self, address: u16) -> Option<u16> {
        self.last_good_reading.get(&address).copied()
    }

    /// Healthy and holding something to show.
    pub fn is_connected(&self) -> bool {
        self.connection_healthy && self.has_data()
    }
}

pub fn reading_from_words(words: &[u16]) -> RawReading {
    words
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u16, *v))
        .collect()
}

/// Shared handle on the current [`CachedState`] of one controller.
///
/// Writers swap in a whole new snapshot, so a reader holding an `Arc` from
/// [`RegisterCache::snapshot`] never sees a half-applied poll.
#[derive(Clone, Debug, Default)]
pub struct RegisterCache {
    state: Arc<RwLock<Arc<CachedState>>>,
}

impl RegisterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<CachedState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace(&self, state: CachedState) -> Arc<CachedState> {
        let state = Arc::new(state);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state.clone();
        state
    }
}
