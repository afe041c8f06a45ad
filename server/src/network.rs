//! Server network layer: TCP accept loop, per-connection reader/writer
//! tasks and the registry of running rooms.

use crate::config::ServerConfig;
use crate::publisher::Outbox;
use crate::session::{RoomConfig, RoomMessage, RoomSession};
use log::{debug, error, info, warn};
use shared::{read_packet, write_packet, EntityId, Packet, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

pub type RoomSender = mpsc::UnboundedSender<RoomMessage>;

/// Running rooms by name. Each room is an independent task that owns its
/// `RoomSession`; rooms share nothing but this lookup table.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomSender>>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            config,
        })
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Hands `outbox` to the room called `name`, creating the room if it is
    /// not running. The open notification is queued while the registry lock
    /// is held so a room can never be disposed between lookup and join.
    pub async fn join(self: &Arc<Self>, name: &str, id: EntityId, outbox: Outbox) -> RoomSender {
        let mut rooms = self.rooms.lock().await;
        let mut message = RoomMessage::Opened { id, outbox };

        if let Some(room) = rooms.get(name) {
            match room.send(message) {
                Ok(()) => return room.clone(),
                Err(mpsc::error::SendError(returned)) => {
                    warn!("Room {} stopped without deregistering", name);
                    message = returned;
                }
            }
        }

        let (room, inbox) = mpsc::unbounded_channel();
        if room.send(message).is_err() {
            error!("Failed to queue join for {} in new room {}", id, name);
        }
        rooms.insert(name.to_string(), room.clone());

        let session = RoomSession::new(name, &self.config);
        tokio::spawn(Arc::clone(self).run_room(session, inbox));

        room
    }

    async fn run_room(
        self: Arc<Self>,
        mut session: RoomSession,
        mut inbox: mpsc::UnboundedReceiver<RoomMessage>,
    ) {
        info!("Room {} created", session.name());

        while let Some(message) = inbox.recv().await {
            session.handle(message);

            if session.is_empty() {
                let mut rooms = self.rooms.lock().await;
                // Anything queued before we took the lock still belongs here.
                while let Ok(message) = inbox.try_recv() {
                    session.handle(message);
                }

                if session.is_empty() {
                    rooms.remove(session.name());
                    info!("Room {} disposed", session.name());
                    return;
                }
            }
        }
    }
}

pub struct Server {
    listener: TcpListener,
    rooms: Arc<RoomRegistry>,
    next_id: EntityId,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            rooms: RoomRegistry::new(config.room),
            next_id: 1,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn rooms(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.rooms)
    }

    /// Accepts connections until the process stops.
    pub async fn run(mut self) -> io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.allocate_id()?;
                    debug!("Connection {} accepted from {}", id, addr);
                    tokio::spawn(handle_connection(stream, id, Arc::clone(&self.rooms)));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    fn allocate_id(&mut self) -> io::Result<EntityId> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "identity space exhausted"))?;
        Ok(id)
    }
}

/// Why a connection's writer task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterExit {
    /// Every sender was dropped. While the connection is still reading,
    /// only the room can cause this, by rejecting the join.
    Released,
    /// The socket refused a write.
    Failed,
}

async fn handle_connection(stream: TcpStream, id: EntityId, rooms: Arc<RoomRegistry>) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Connection {}: failed to set TCP_NODELAY: {}", id, e);
    }

    let (mut reader, writer) = stream.into_split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(run_writer(id, writer, outbox_rx));

    let Some(room_name) = await_join(id, &mut reader, &outbox).await else {
        return;
    };

    let room = rooms.join(&room_name, id, outbox).await;

    let released = loop {
        tokio::select! {
            exit = &mut writer => break matches!(exit, Ok(WriterExit::Released)),
            result = read_packet(&mut reader) => match result {
                Ok(Some(Packet::Leave)) | Ok(None) => break false,
                Ok(Some(packet)) => {
                    if room.send(RoomMessage::PacketReceived { id, packet }).is_err() {
                        break false;
                    }
                }
                Err(e) => {
                    warn!("Connection {}: read failed: {}", id, e);
                    break false;
                }
            },
        }
    };

    // A rejected connection never held a place in the room, and its identity
    // may belong to someone who does.
    if released {
        info!("Connection {}: rejected by room {}, closing", id, room_name);
        return;
    }

    if room.send(RoomMessage::Closed { id }).is_err() {
        debug!("Connection {}: room {} already stopped", id, room_name);
    }
}

/// Reads the opening `Join`. Anything else ends the connection.
async fn await_join(id: EntityId, reader: &mut OwnedReadHalf, outbox: &Outbox) -> Option<String> {
    let reason = match read_packet(reader).await {
        Ok(Some(Packet::Join {
            room,
            client_version,
        })) if client_version == PROTOCOL_VERSION => return Some(room),
        Ok(Some(Packet::Join { client_version, .. })) => {
            info!(
                "Connection {}: client version {} unsupported (expected {})",
                id, client_version, PROTOCOL_VERSION
            );
            "Protocol version mismatch"
        }
        Ok(Some(other)) => {
            warn!("Connection {}: expected join, got {:?}", id, other);
            "Expected join"
        }
        Ok(None) => return None,
        Err(e) => {
            warn!("Connection {}: failed to read join: {}", id, e);
            "Invalid packet"
        }
    };

    if outbox
        .send(Packet::Rejected {
            reason: reason.to_string(),
        })
        .is_err()
    {
        debug!("Connection {}: writer already gone", id);
    }
    None
}

async fn run_writer(
    id: EntityId,
    mut writer: OwnedWriteHalf,
    mut outbox: mpsc::UnboundedReceiver<Packet>,
) -> WriterExit {
    let mut exit = WriterExit::Released;
    while let Some(packet) = outbox.recv().await {
        if let Err(e) = write_packet(&mut writer, &packet).await {
            debug!("Connection {}: write failed: {}", id, e);
            exit = WriterExit::Failed;
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Connection {}: shutdown failed: {}", id, e);
    }
    exit
}
