use crate::store::Feeds;
use crate::wire::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Producer,
    Consumer,
}

impl Sink {
    pub fn label(self) -> &'static str {
        match self {
            Sink::Producer => "producer",
            Sink::Consumer => "consumer",
        }
    }
}

/// Where an envelope landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub sink: Sink,
    pub key: String,
    pub appended: usize,
    /// The key was not seeded and has just been created.
    pub created: bool,
}

/// Appends the envelope's records to the log its `display_area` selects.
///
/// Unrecognized tags are not rejected: they become consumer buckets of their own.
pub fn route(envelope: Envelope, feeds: &mut Feeds) -> Routed {
    match envelope {
        Envelope::Producer {
            topic_name,
            messages,
        } => {
            let appended = messages.len();
            let created = feeds.producer.append(&topic_name, messages);
            Routed {
                sink: Sink::Producer,
                key: topic_name,
                appended,
                created,
            }
        }
        Envelope::ConsumerBucket { key, messages } => {
            let appended = messages.len();
            let created = feeds.consumer.append(&key, messages);
            Routed {
                sink: Sink::Consumer,
                key,
                appended,
                created,
            }
        }
    }
}
