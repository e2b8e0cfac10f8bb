use thiserror::Error;

use crate::wire::Command;
use crate::{CONSUMER_BUCKETS, DEFAULT_BATCH_COUNT, DEFAULT_CONSUMER_BUCKET, PUBLISH_TARGETS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no publisher for {topic} version {version}")]
    UnknownPublishTarget { topic: String, version: String },
    #[error("no consumer bucket {0}")]
    UnknownBucket(String),
    #[error("batch count must be a positive integer, got {0:?}")]
    InvalidBatchCount(String),
}

/// Outbound side of the connection. Sending is fire-and-forget.
pub trait CommandSink {
    /// Returns true when the command was handed to the connection, false when
    /// it was dropped.
    fn send(&self, command: Command) -> bool;
}

/// User choices that shape the display and the next publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    bucket: String,
    batch_count: u32,
}

impl Selection {
    pub fn new(batch_count: u32) -> Result<Self, DispatchError> {
        if batch_count == 0 {
            return Err(DispatchError::InvalidBatchCount(batch_count.to_string()));
        }
        Ok(Self {
            bucket: DEFAULT_CONSUMER_BUCKET.to_string(),
            batch_count,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn batch_count(&self) -> u32 {
        self.batch_count
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_CONSUMER_BUCKET.to_string(),
            batch_count: DEFAULT_BATCH_COUNT,
        }
    }
}

pub fn bucket_key(topic: &str, version: &str) -> String {
    format!("{topic}.{version}")
}

fn is_publish_target(topic: &str, version: &str) -> bool {
    PUBLISH_TARGETS
        .iter()
        .any(|(known_topic, known_version)| *known_topic == topic && *known_version == version)
}

pub struct Dispatcher<S> {
    sink: S,
    selection: Selection,
}

impl<S: CommandSink> Dispatcher<S> {
    pub fn new(sink: S, selection: Selection) -> Self {
        Self { sink, selection }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Asks the backend to publish a batch of the current size. The resulting
    /// feed updates arrive later on the inbound path. `Ok(false)` means the
    /// sink dropped the command.
    pub fn request_publish(&self, topic: &str, version: &str) -> Result<bool, DispatchError> {
        if !is_publish_target(topic, version) {
            return Err(DispatchError::UnknownPublishTarget {
                topic: topic.to_string(),
                version: version.to_string(),
            });
        }
        let command = Command::PlayStream {
            batch_count: self.selection.batch_count,
            stream_topic: topic.to_string(),
            stream_version: version.to_string(),
        };
        Ok(self.sink.send(command))
    }

    /// Switches which consumer bucket is displayed. Local only.
    pub fn set_consumer_expectation(
        &mut self,
        topic: &str,
        version: &str,
    ) -> Result<&str, DispatchError> {
        let key = bucket_key(topic, version);
        if !CONSUMER_BUCKETS.contains(&key.as_str()) {
            return Err(DispatchError::UnknownBucket(key));
        }
        self.selection.bucket = key;
        Ok(&self.selection.bucket)
    }

    pub fn set_batch_count(&mut self, batch_count: u32) -> Result<(), DispatchError> {
        if batch_count == 0 {
            return Err(DispatchError::InvalidBatchCount(batch_count.to_string()));
        }
        self.selection.batch_count = batch_count;
        Ok(())
    }

    /// Parses batch-size text as typed by the operator.
    pub fn set_batch_count_text(&mut self, text: &str) -> Result<(), DispatchError> {
        let trimmed = text.trim();
        let batch_count = trimmed
            .parse::<u32>()
            .map_err(|_| DispatchError::InvalidBatchCount(trimmed.to_string()))?;
        self.set_batch_count(batch_count)
    }

    pub fn step_batch_count(&mut self, delta: i64) {
        let next = (i64::from(self.selection.batch_count) + delta).clamp(1, i64::from(u32::MAX));
        self.selection.batch_count = next as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        sent: RefCell<Vec<Command>>,
    }

    impl CommandSink for RecordingSink {
        fn send(&self, command: Command) -> bool {
            self.sent.borrow_mut().push(command);
            true
        }
    }

    fn dispatcher() -> Dispatcher<RecordingSink> {
        Dispatcher::new(RecordingSink::default(), Selection::default())
    }

    #[test]
    fn initial_selection_is_default_bucket() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.selection().bucket(), "person-v1.0");
        assert_eq!(dispatcher.selection().batch_count(), 3);
    }

    #[test]
    fn consumer_expectation_concatenates_topic_and_version() {
        let mut dispatcher = dispatcher();
        let key = dispatcher
            .set_consumer_expectation("person-v1", "1")
            .expect("known bucket")
            .to_string();
        assert_eq!(key, "person-v1.1");
        assert_eq!(dispatcher.selection().bucket(), "person-v1.1");
        assert!(dispatcher.sink().sent.borrow().is_empty());
    }

    #[test]
    fn consumer_expectation_rejects_unseeded_bucket() {
        let mut dispatcher = dispatcher();
        dispatcher
            .set_consumer_expectation("person-v2", "0")
            .expect("known bucket");

        let err = dispatcher
            .set_consumer_expectation("person-v2", "na")
            .expect_err("not a bucket");
        assert_eq!(err, DispatchError::UnknownBucket("person-v2.na".to_string()));
        assert_eq!(dispatcher.selection().bucket(), "person-v2.0");
    }

    #[test]
    fn publish_sends_exactly_one_play_stream() {
        let mut dispatcher = dispatcher();
        dispatcher.set_batch_count(5).expect("positive");
        assert!(dispatcher
            .request_publish("person-v1", "1")
            .expect("known target"));

        let sent = dispatcher.sink().sent.borrow();
        assert_eq!(
            *sent,
            vec![Command::PlayStream {
                batch_count: 5,
                stream_topic: "person-v1".to_string(),
                stream_version: "1".to_string(),
            }]
        );
    }

    #[test]
    fn publish_whitelist_is_enforced() {
        let dispatcher = dispatcher();
        assert!(dispatcher.request_publish("person-v2", "na").is_ok());
        assert!(dispatcher.request_publish("person-v1", "2").is_ok());
        assert!(matches!(
            dispatcher.request_publish("person-v2", "1"),
            Err(DispatchError::UnknownPublishTarget { .. })
        ));
        assert!(dispatcher.request_publish("person-v1", "na").is_err());
        assert_eq!(dispatcher.sink().sent.borrow().len(), 2);
    }

    #[test]
    fn batch_count_text_must_be_positive() {
        let mut dispatcher = dispatcher();
        dispatcher.set_batch_count_text(" 12 ").expect("valid");
        assert_eq!(dispatcher.selection().batch_count(), 12);

        assert_eq!(
            dispatcher.set_batch_count_text("0"),
            Err(DispatchError::InvalidBatchCount("0".to_string()))
        );
        assert!(dispatcher.set_batch_count_text("three").is_err());
        assert!(dispatcher.set_batch_count_text("-2").is_err());
        assert_eq!(dispatcher.selection().batch_count(), 12);
    }

    #[test]
    fn batch_count_step_stays_positive() {
        let mut dispatcher = dispatcher();
        dispatcher.step_batch_count(-10);
        assert_eq!(dispatcher.selection().batch_count(), 1);
        dispatcher.step_batch_count(4);
        assert_eq!(dispatcher.selection().batch_count(), 5);
    }

    #[test]
    fn zero_batch_selection_is_rejected() {
        assert!(Selection::new(0).is_err());
        assert_eq!(Selection::new(7).expect("positive").batch_count(), 7);
    }
}
