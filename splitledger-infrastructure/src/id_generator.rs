use rand::{Rng, distr::Alphanumeric};
use splitledger_application::IdGenerator;
use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

pub const DEFAULT_ID_LENGTH: usize = 12;

/// Random alphanumeric identifiers. Uniqueness is left to the stores.
#[derive(Clone, Copy, Debug)]
pub struct RandomIdGenerator {
    length: usize,
}

impl RandomIdGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Deterministic ids for replays and tests.
///
/// Hands out any queued ids first, then `{prefix}{n}` with a running counter.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    prefix: String,
    counter: AtomicU64,
    queued: Mutex<VecDeque<String>>,
}

impl SequenceIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
            queued: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues ids to be returned before the counter is used.
    pub fn with_queued<I, T>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        if let Ok(mut queued) = self.queued.lock() {
            queued.extend(ids.into_iter().map(Into::into));
        }
        self
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> String {
        if let Ok(mut queued) = self.queued.lock()
            && let Some(id) = queued.pop_front()
        {
            return id;
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(12)]
    #[case(32)]
    fn random_ids_have_requested_length(#[case] length: usize) {
        let id = RandomIdGenerator::new(length).next_id();
        assert_eq!(id.len(), length);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sequence_drains_queue_before_counting() {
        let ids = SequenceIdGenerator::new("g").with_queued(["dup", "dup"]);
        let drawn: Vec<String> = (0..4).map(|_| ids.next_id()).collect();
        assert_eq!(drawn, vec!["dup", "dup", "g1", "g2"]);
    }
}
