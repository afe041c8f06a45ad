//! Client network layer: one TCP session with the room server.
//!
//! Inbound events are applied to the shared shadow state as they arrive;
//! outbound intents are queued on an outbox drained by a writer task, so
//! the frame loop never waits on the network.

use crate::shadow::{self, SharedShadow, ShadowUpdate};
use log::{debug, info, warn};
use shared::{
    read_packet, write_packet, CodecError, Packet, Position, WorldBounds, PROTOCOL_VERSION,
};
use std::io;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Codec(#[from] CodecError),
    #[error("rejected by server: {0}")]
    Rejected(String),
}

/// Handle used by the frame loop to issue move intents. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    shadow: SharedShadow,
    bounds: WorldBounds,
    outbox: mpsc::UnboundedSender<Packet>,
}

impl Client {
    /// Returns the handle plus the outbox receiver to pass to `run_session`.
    pub fn new(shadow: SharedShadow, bounds: WorldBounds) -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        (
            Client {
                shadow,
                bounds,
                outbox,
            },
            outbox_rx,
        )
    }

    pub fn shadow(&self) -> &SharedShadow {
        &self.shadow
    }

    /// Clamps `target`, retargets the local entity right away and queues the
    /// intent. The server's answer replaces the optimistic target.
    pub fn request_move(&self, target: Position) -> Position {
        let target = self.bounds.clamp(target);
        shadow::lock(&self.shadow).set_local_target(target);

        if self.outbox.send(Packet::move_intent(target)).is_err() {
            debug!("Session closed, dropping move intent");
        }
        target
    }

    pub fn leave(&self) {
        if self.outbox.send(Packet::Leave).is_err() {
            debug!("Session already closed");
        }
    }
}

/// Connects, joins `room` and applies events to `shadow` until the server
/// closes the stream. The shadow state is cleared when the session ends,
/// whatever the reason.
pub async fn run_session(
    address: String,
    room: String,
    shadow: SharedShadow,
    mut outbox: mpsc::UnboundedReceiver<Packet>,
) -> Result<(), ClientError> {
    let stream = TcpStream::connect(&address).await?;
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    write_packet(
        &mut writer,
        &Packet::Join {
            room: room.clone(),
            client_version: PROTOCOL_VERSION,
        },
    )
    .await?;
    info!("Joining room {} on {}", room, address);

    let writer_task = tokio::spawn(async move {
        while let Some(packet) = outbox.recv().await {
            let leaving = matches!(packet, Packet::Leave);
            write_packet(&mut writer, &packet).await?;
            if leaving {
                break;
            }
        }
        writer.shutdown().await?;
        Ok::<(), CodecError>(())
    });

    let result = read_events(&mut reader, &shadow).await;

    writer_task.abort();
    let released = shadow::lock(&shadow).clear();
    debug!("Session ended, released {} shadow entities", released.len());

    result
}

async fn read_events(reader: &mut OwnedReadHalf, shadow: &SharedShadow) -> Result<(), ClientError> {
    loop {
        match read_packet(reader).await? {
            Some(Packet::Event(event)) => {
                let update = shadow::lock(shadow).apply(&event);
                match update {
                    ShadowUpdate::Spawned { id, is_self: true } => info!("Joined as entity {}", id),
                    ShadowUpdate::Ignored => {}
                    other => debug!("{:?}", other),
                }
            }
            Some(Packet::Rejected { reason }) => {
                warn!("Server rejected us: {}", reason);
                return Err(ClientError::Rejected(reason));
            }
            Some(other) => warn!("Unexpected packet from server: {:?}", other),
            None => {
                info!("Server closed the connection");
                return Ok(());
            }
        }
    }
}
