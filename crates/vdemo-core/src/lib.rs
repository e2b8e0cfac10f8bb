pub mod classifier;
pub mod dispatch;
pub mod display;
pub mod store;
pub mod wire;

pub use classifier::{route, Routed, Sink};
pub use dispatch::{bucket_key, CommandSink, DispatchError, Dispatcher, Selection};
pub use display::RecordLine;
pub use store::{FeedSnapshot, FeedStore, Feeds};
pub use wire::{decode_envelope, encode_command, Command, Envelope, Record, WireError};

/// Port the demo backend listens on. Only the host is configurable.
pub const BACKEND_PORT: u16 = 5678;

pub const PRODUCER_DISPLAY_AREA: &str = "producer";

/// Topics the producer panel is seeded with.
pub const PRODUCER_TOPICS: [&str; 2] = ["person-v1", "person-v2"];

/// Consumer schema expectations the backend interprets records against.
pub const CONSUMER_BUCKETS: [&str; 3] = ["person-v1.0", "person-v1.1", "person-v2.0"];

pub const DEFAULT_CONSUMER_BUCKET: &str = "person-v1.0";

pub const DEFAULT_BATCH_COUNT: u32 = 3;

/// Topic/version pairs the backend accepts in `play-stream`.
pub const PUBLISH_TARGETS: [(&str, &str); 3] = [
    ("person-v1", "1"),
    ("person-v1", "2"),
    ("person-v2", "na"),
];

/// Leading character the backend puts on `version` when a record could only
/// be shown by falling back to an older schema.
pub const WARNING_MARKER: char = 'W';
