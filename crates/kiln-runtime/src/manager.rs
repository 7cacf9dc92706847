//! Room and client registry.
//!
//! Clients live in rooms; each client has an id unique within its room.
//! All mutations take the registry write lock, and sends work on a
//! snapshot so no lock is held while a socket is written.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::connection::Connection;
use crate::error::{RuntimeError, RuntimeResult};
use crate::message::{Outbound, Target};

/// Room used when a handler does not name one.
pub const DEFAULT_ROOM: &str = "default";

/// Close code used for errors that carry no status of their own.
pub const DEFAULT_CLOSE_CODE: u16 = 1007;

type Room<C> = FxHashMap<String, Arc<C>>;

/// Registry of live connections, keyed by room then client id.
pub struct ConnectionManager<C> {
    rooms: RwLock<FxHashMap<String, Room<C>>>,
}

impl<C> Default for ConnectionManager<C> {
    fn default() -> Self {
        Self {
            rooms: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<C: Connection> ConnectionManager<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a connection and register it.
    ///
    /// Returns the client id, generated when none is given. Registering
    /// an id that is already in the room replaces the previous socket.
    /// A connection holds one key at a time: connecting it again moves it.
    pub async fn connect(
        &self,
        conn: Arc<C>,
        room_id: Option<&str>,
        client_id: Option<&str>,
    ) -> RuntimeResult<String> {
        let room_id = room_id.unwrap_or(DEFAULT_ROOM).to_string();
        let client_id = client_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        conn.accept().await?;

        let mut rooms = self.rooms.write().await;
        for room in rooms.values_mut() {
            room.retain(|_, c| !Arc::ptr_eq(c, &conn));
        }
        rooms.retain(|_, room| !room.is_empty());
        rooms
            .entry(room_id.clone())
            .or_default()
            .insert(client_id.clone(), conn);
        tracing::debug!(room = %room_id, client = %client_id, "client connected");
        Ok(client_id)
    }

    /// Unregister a connection from a room.
    ///
    /// Returns whether it was registered there. Rooms left empty are
    /// dropped.
    pub async fn disconnect(&self, conn: &Arc<C>, room_id: Option<&str>) -> bool {
        let room_id = room_id.unwrap_or(DEFAULT_ROOM);
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };

        let client_id = room
            .iter()
            .find(|(_, c)| Arc::ptr_eq(c, conn))
            .map(|(id, _)| id.clone());
        if let Some(id) = &client_id {
            room.remove(id);
            tracing::debug!(room = %room_id, client = %id, "client disconnected");
        }
        if room.is_empty() {
            rooms.remove(room_id);
        }
        client_id.is_some()
    }

    /// Send text to one client of a room, or to the whole room when no
    /// client is given.
    ///
    /// Unknown rooms and clients are a no-op. A failing socket in a room
    /// fan-out is logged and skipped; a failing addressed send is returned.
    /// Returns the number of clients written to.
    pub async fn send(
        &self,
        text: &str,
        room_id: Option<&str>,
        client_id: Option<&str>,
    ) -> RuntimeResult<usize> {
        let room_id = room_id.unwrap_or(DEFAULT_ROOM);

        if let Some(client_id) = client_id {
            let conn = {
                let rooms = self.rooms.read().await;
                rooms.get(room_id).and_then(|room| room.get(client_id)).cloned()
            };
            return match conn {
                Some(conn) => conn.send_text(text).await.map(|()| 1),
                None => Ok(0),
            };
        }

        let targets: Vec<Arc<C>> = {
            let rooms = self.rooms.read().await;
            rooms
                .get(room_id)
                .map(|room| room.values().cloned().collect())
                .unwrap_or_default()
        };
        Ok(fan_out(&targets, text).await)
    }

    /// Send text to every client in every room.
    pub async fn broadcast_all(&self, text: &str) -> usize {
        let targets: Vec<Arc<C>> = {
            let rooms = self.rooms.read().await;
            rooms.values().flat_map(|room| room.values().cloned()).collect()
        };
        fan_out(&targets, text).await
    }

    /// Report a handler failure to the client and close it.
    ///
    /// The close code is the error's own status when it has one, otherwise
    /// [`DEFAULT_CLOSE_CODE`]. Failures while reporting are ignored since
    /// the socket is usually already gone.
    pub async fn handle_error(&self, conn: &C, err: &RuntimeError) {
        let message = err.to_string();
        if let Err(e) = conn.send_text(&message).await {
            tracing::debug!("could not report error to client: {}", e);
        }
        if let Err(e) = conn.close(err.close_code(), &message).await {
            tracing::debug!("could not close client: {}", e);
        }
    }

    /// Deliver a handler result.
    pub async fn route_message(&self, message: Outbound) -> RuntimeResult<usize> {
        let payload = message.payload();
        match message {
            Outbound::Broadcast(_) => Ok(self.broadcast_all(&payload).await),
            Outbound::Discarded(_) => {
                tracing::debug!("dropping message with empty target");
                Ok(0)
            }
            Outbound::Addressed { target, .. } => match target {
                Target::Client(client_id) => self.send(&payload, None, Some(&client_id)).await,
                Target::Room(room_id) => self.send(&payload, Some(&room_id), None).await,
                Target::Both { room_id, client_id } => {
                    self.send(&payload, Some(&room_id), Some(&client_id)).await
                }
            },
        }
    }

    /// Number of clients in a room.
    pub async fn room_size(&self, room_id: &str) -> usize {
        self.rooms.read().await.get(room_id).map_or(0, |room| room.len())
    }

    /// Number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Whether a connection is registered in any room.
    pub async fn is_connected(&self, conn: &Arc<C>) -> bool {
        self.rooms
            .read()
            .await
            .values()
            .any(|room| room.values().any(|c| Arc::ptr_eq(c, conn)))
    }
}

async fn fan_out<C: Connection>(targets: &[Arc<C>], text: &str) -> usize {
    let mut delivered = 0;
    for conn in targets {
        match conn.send_text(text).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!("skipping client: {}", e),
        }
    }
    delivered
}
