use std::collections::HashMap;
use std::sync::Mutex;

use super::{next_count, pair_key, CounterSnapshot, MatchCounterStore};
use crate::error::StoreError;

/// Process-local counters. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryCounterStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchCounterStore for MemoryCounterStore {
    fn increment(&self, team1: &str, team2: &str) -> Result<u64, StoreError> {
        let mut counts = self.counts.lock().map_err(|_| StoreError::LockPoisoned)?;
        let key = pair_key(team1, team2);
        let next = next_count(&key, counts.get(&key).copied().unwrap_or(0))?;
        counts.insert(key, next);
        Ok(next)
    }

    fn get(&self, team1: &str, team2: &str) -> Result<u64, StoreError> {
        let counts = self.counts.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(counts.get(&pair_key(team1, team2)).copied().unwrap_or(0))
    }

    fn snapshot(&self) -> Result<CounterSnapshot, StoreError> {
        let counts = self.counts.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(counts.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::contract;
    use std::sync::Arc;

    #[test]
    fn first_increment_then_get() {
        contract::first_increment_then_get(&MemoryCounterStore::new());
    }

    #[test]
    fn reversed_pair_shares_count() {
        contract::reversed_pair_shares_count(&MemoryCounterStore::new());
    }

    #[test]
    fn unseen_pair_is_zero() {
        contract::unseen_pair_is_zero(&MemoryCounterStore::new());
    }

    #[test]
    fn sequential_increments_are_exact() {
        contract::sequential_increments_are_exact(&MemoryCounterStore::new());
    }

    #[test]
    fn saturated_counter_is_refused_without_poisoning() {
        let store = MemoryCounterStore::new();
        store
            .counts
            .lock()
            .unwrap()
            .insert(pair_key("Pumas", "Leones"), u64::MAX);

        assert!(matches!(
            store.increment("Leones", "Pumas"),
            Err(StoreError::Overflow(_))
        ));
        assert_eq!(store.get("Pumas", "Leones").unwrap(), u64::MAX);
        assert_eq!(store.increment("Tigres", "Atlas").unwrap(), 1);
    }

    #[test]
    fn concurrent_increments_lose_nothing() {
        contract::concurrent_increments_lose_nothing(Arc::new(MemoryCounterStore::new()));
    }
}
