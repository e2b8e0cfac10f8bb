//! Duplex WebSocket link to the demo backend.
//!
//! One connection per session: it is opened once, announces itself with
//! `setup-connect`, forwards decoded envelopes to the owner and is closed when
//! the owner shuts the link down or the backend goes away. There is no
//! reconnect.

mod connection;

pub use connection::{LinkEvent, LinkHandle, LinkState};

use thiserror::Error;
use url::Url;
use vdemo_core::{WireError, BACKEND_PORT};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid backend address: {0}")]
    Url(#[from] url::ParseError),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// `ws://<host>:5678`; the port is fixed by the backend.
pub fn backend_url(host: &str) -> Result<Url, LinkError> {
    Ok(Url::parse(&format!("ws://{}:{BACKEND_PORT}", host.trim()))?)
}
