use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{PRODUCER_DISPLAY_AREA, WARNING_MARKER};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("producer envelope missing topic_name")]
    MissingTopic,
}

/// One simulated person event as the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub timestamp: String,
    pub version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_adult: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
}

impl Record {
    pub fn new(timestamp: &str, version: &str, name: &str) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            version: version.to_string(),
            name: name.to_string(),
            age: None,
            is_adult: None,
            address: None,
        }
    }

    /// True when the backend had to fall back to another schema to show this record.
    pub fn is_warning(&self) -> bool {
        self.version.starts_with(WARNING_MARKER)
    }
}

// Optional fields of the wrong type are dropped rather than failing the whole batch.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.as_bool()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

/// Inbound batch, routed by its `display_area` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope", into = "RawEnvelope")]
pub enum Envelope {
    Producer {
        topic_name: String,
        messages: Vec<Record>,
    },
    /// Any tag other than `producer`; the tag names the consumer bucket.
    ConsumerBucket { key: String, messages: Vec<Record> },
}

impl Envelope {
    pub fn display_area(&self) -> &str {
        match self {
            Envelope::Producer { .. } => PRODUCER_DISPLAY_AREA,
            Envelope::ConsumerBucket { key, .. } => key,
        }
    }

    pub fn messages(&self) -> &[Record] {
        match self {
            Envelope::Producer { messages, .. } | Envelope::ConsumerBucket { messages, .. } => {
                messages
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEnvelope {
    display_area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic_name: Option<String>,
    messages: Vec<Record>,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = WireError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        if raw.display_area == PRODUCER_DISPLAY_AREA {
            let topic_name = raw.topic_name.ok_or(WireError::MissingTopic)?;
            return Ok(Envelope::Producer {
                topic_name,
                messages: raw.messages,
            });
        }
        Ok(Envelope::ConsumerBucket {
            key: raw.display_area,
            messages: raw.messages,
        })
    }
}

impl From<Envelope> for RawEnvelope {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Producer {
                topic_name,
                messages,
            } => RawEnvelope {
                display_area: PRODUCER_DISPLAY_AREA.to_string(),
                topic_name: Some(topic_name),
                messages,
            },
            Envelope::ConsumerBucket { key, messages } => RawEnvelope {
                display_area: key,
                topic_name: None,
                messages,
            },
        }
    }
}

/// Outbound request to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    /// Handshake; the backend starts relaying topics after it.
    SetupConnect,
    PlayStream {
        batch_count: u32,
        stream_topic: String,
        stream_version: String,
    },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetupConnect => "setup-connect",
            Command::PlayStream { .. } => "play-stream",
        }
    }
}

pub fn decode_envelope(text: &str) -> Result<Envelope, WireError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;
    Envelope::try_from(raw)
}

pub fn encode_command(command: &Command) -> Result<String, WireError> {
    Ok(serde_json::to_string(command)?)
}
