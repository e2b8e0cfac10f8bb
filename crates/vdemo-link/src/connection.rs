use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;
use vdemo_core::{decode_envelope, encode_command, Command, CommandSink, Envelope};

use crate::LinkError;

const COMMAND_QUEUE_CAPACITY: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    /// Handshake sent; commands are accepted.
    Ready,
    Closed,
}

impl LinkState {
    pub fn label(self) -> &'static str {
        match self {
            LinkState::Connecting => "connecting",
            LinkState::Ready => "ready",
            LinkState::Closed => "closed",
        }
    }
}

#[derive(Debug)]
pub enum LinkEvent {
    State(LinkState),
    Envelope(Envelope),
    /// One inbound message could not be decoded; nothing else is affected.
    DecodeFailed(String),
    /// The connection could not be opened or failed mid-session.
    Failed(String),
}

/// Owner's side of the link. Dropping it, or calling [`LinkHandle::shutdown`],
/// closes the socket even if nobody is reading the event channel any more.
pub struct LinkHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<LinkState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LinkHandle {
    pub fn spawn(url: Url, events: mpsc::Sender<LinkEvent>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            drive(url, state_tx, events, command_rx, shutdown_rx).await;
        });
        Self {
            commands: command_tx,
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Closes the connection and waits for the link task to finish.
    pub async fn shutdown(self) {
        let LinkHandle {
            commands,
            shutdown,
            task,
            ..
        } = self;
        shutdown.send_replace(true);
        drop(commands);
        if let Err(err) = task.await {
            warn!(event = "link_task_join_error", error = %err);
        }
    }
}

impl CommandSink for LinkHandle {
    fn send(&self, command: Command) -> bool {
        let state = self.state();
        if state != LinkState::Ready {
            debug!(
                event = "link_command_dropped",
                reason = "not_ready",
                state = state.label(),
                command = command.kind()
            );
            return false;
        }
        let kind = command.kind();
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    event = "link_command_dropped",
                    reason = "queue_full",
                    command = kind,
                    capacity = COMMAND_QUEUE_CAPACITY
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(
                    event = "link_command_dropped",
                    reason = "channel_closed",
                    command = kind
                );
                false
            }
        }
    }
}

/// Resolves once the owner asked for shutdown or went away.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|requested| *requested).await;
}

/// Hands one event to the owner. Returns false when the owner stopped
/// listening or asked for shutdown while the channel was full.
async fn deliver(
    events: &mpsc::Sender<LinkEvent>,
    event: LinkEvent,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        biased;
        sent = events.send(event) => sent.is_ok(),
        _ = shutdown_requested(shutdown) => false,
    }
}

async fn drive(
    url: Url,
    state_tx: watch::Sender<LinkState>,
    events: mpsc::Sender<LinkEvent>,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(err) = run(&url, &state_tx, &events, &mut commands, &mut shutdown).await {
        warn!(event = "link_error", url = %url, error = %err);
        deliver(&events, LinkEvent::Failed(err.to_string()), &mut shutdown).await;
    }
    state_tx.send_replace(LinkState::Closed);
    info!(event = "link_closed", url = %url);
    deliver(&events, LinkEvent::State(LinkState::Closed), &mut shutdown).await;
}

async fn run(
    url: &Url,
    state_tx: &watch::Sender<LinkState>,
    events: &mpsc::Sender<LinkEvent>,
    commands: &mut mpsc::Receiver<Command>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), LinkError> {
    let mut socket = tokio::select! {
        connected = connect_async(url.as_str()) => connected?.0,
        _ = shutdown_requested(shutdown) => return Ok(()),
    };
    info!(event = "link_opened", url = %url);

    let outcome = serve(&mut socket, state_tx, events, commands, shutdown).await;
    if let Err(err) = socket.close(None).await {
        debug!(event = "link_close_error", error = %err);
    }
    outcome
}

async fn serve(
    socket: &mut Socket,
    state_tx: &watch::Sender<LinkState>,
    events: &mpsc::Sender<LinkEvent>,
    commands: &mut mpsc::Receiver<Command>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), LinkError> {
    let handshake = encode_command(&Command::SetupConnect)?;
    socket.send(Message::Text(handshake)).await?;
    state_tx.send_replace(LinkState::Ready);
    if !deliver(events, LinkEvent::State(LinkState::Ready), shutdown).await {
        return Ok(());
    }

    loop {
        tokio::select! {
            inbound = socket.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !forward(&text, events, shutdown).await {
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(event = "link_closed_by_peer", frame = ?frame);
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                }
            }
            outbound = commands.recv() => {
                let Some(command) = outbound else {
                    return Ok(());
                };
                let text = encode_command(&command)?;
                socket.send(Message::Text(text)).await?;
                debug!(event = "link_command_sent", command = command.kind());
            }
            _ = shutdown_requested(shutdown) => return Ok(()),
        }
    }
}

/// Returns false once the owner has stopped listening.
async fn forward(
    text: &str,
    events: &mpsc::Sender<LinkEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let event = match decode_envelope(text) {
        Ok(envelope) => {
            debug!(
                event = "link_envelope",
                display_area = envelope.display_area(),
                records = envelope.messages().len()
            );
            LinkEvent::Envelope(envelope)
        }
        Err(err) => {
            warn!(event = "link_decode_error", error = %err, bytes = text.len());
            LinkEvent::DecodeFailed(err.to_string())
        }
    };
    deliver(events, event, shutdown).await
}
