use std::collections::BTreeMap;
use std::sync::Arc;

use crate::wire::Record;
use crate::{CONSUMER_BUCKETS, PRODUCER_TOPICS};

/// Append-only record logs keyed by topic or bucket.
///
/// Each append swaps in a new `Arc<[Record]>` for the key, so a snapshot taken
/// before the append keeps seeing the old log in full.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    logs: BTreeMap<String, Arc<[Record]>>,
}

/// Point-in-time view of a [`FeedStore`], shared with the renderer.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    logs: BTreeMap<String, Arc<[Record]>>,
}

impl FeedStore {
    pub fn seeded<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let logs = keys
            .into_iter()
            .map(|key| (key.into(), Arc::<[Record]>::from(Vec::new())))
            .collect();
        Self { logs }
    }

    /// Appends `records` after the existing log for `key`. Unknown keys start
    /// empty. Returns true when the key did not exist before.
    pub fn append(&mut self, key: &str, records: Vec<Record>) -> bool {
        let previous = self.logs.get(key);
        let created = previous.is_none();
        let mut next = Vec::with_capacity(previous.map_or(0, |log| log.len()) + records.len());
        if let Some(log) = previous {
            next.extend_from_slice(log);
        }
        next.extend(records);
        self.logs.insert(key.to_string(), Arc::from(next));
        created
    }

    pub fn get(&self, key: &str) -> &[Record] {
        self.logs.get(key).map(|log| &log[..]).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.logs.values().map(|log| log.len()).sum()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            logs: self.logs.clone(),
        }
    }
}

impl FeedSnapshot {
    pub fn get(&self, key: &str) -> &[Record] {
        self.logs.get(key).map(|log| &log[..]).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.logs.iter().map(|(key, log)| (key.as_str(), &log[..]))
    }
}

/// The producer and consumer stores of one session.
#[derive(Debug, Clone)]
pub struct Feeds {
    pub producer: FeedStore,
    pub consumer: FeedStore,
}

impl Feeds {
    pub fn new() -> Self {
        Self {
            producer: FeedStore::seeded(PRODUCER_TOPICS),
            consumer: FeedStore::seeded(CONSUMER_BUCKETS),
        }
    }
}

impl Default for Feeds {
    fn default() -> Self {
        Self::new()
    }
}
