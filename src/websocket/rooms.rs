use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use actix::Recipient;
use log::{debug, error, info};
use uuid::Uuid;

use crate::models::{OutboundFrame, ServerMessage};

/// Identity of one live connection.
pub type ConnId = Uuid;

/// Live connections grouped by the lobby id they are watching.
#[derive(Default)]
pub struct RoomBroadcaster {
    connections: Mutex<HashMap<ConnId, Recipient<OutboundFrame>>>,
    rooms: Mutex<HashMap<String, HashSet<ConnId>>>,
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn: ConnId, recipient: Recipient<OutboundFrame>) {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        connections.insert(conn, recipient);
        info!("Connection {} registered, {} live", conn, connections.len());
    }

    /// Forgets the connection and drops it from whichever room it was in.
    pub fn unregister(&self, conn: ConnId) {
        let remaining = {
            let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
            connections.remove(&conn);
            connections.len()
        };
        self.leave_all(conn);
        info!("Connection {} unregistered, {} live", conn, remaining);
    }

    /// Subscribes `conn` to `room`, replacing any previous membership.
    pub fn join(&self, room: &str, conn: ConnId) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, members) in rooms.iter_mut() {
            if name != room {
                members.remove(&conn);
            }
        }
        rooms.retain(|_, members| !members.is_empty());
        rooms.entry(room.to_string()).or_default().insert(conn);
        debug!("Connection {} joined room {}", conn, room);
    }

    pub fn leave(&self, room: &str, conn: ConnId) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    fn leave_all(&self, conn: ConnId) {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        for members in rooms.values_mut() {
            members.remove(&conn);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    pub fn members(&self, room: &str) -> Vec<ConnId> {
        let rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Queues `message` on every open connection in `room`; closed ones are
    /// skipped. Returns how many connections it was queued for.
    pub fn broadcast(&self, room: &str, message: &ServerMessage) -> usize {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize broadcast for room {}: {}", room, e);
                return 0;
            }
        };

        let members = self.members(room);
        if members.is_empty() {
            debug!("No connections in room {}", room);
            return 0;
        }

        let connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        for conn in members {
            match connections.get(&conn) {
                Some(recipient) if recipient.connected() => {
                    recipient.do_send(OutboundFrame(frame.clone()));
                    delivered += 1;
                }
                _ => debug!("Skipping closed connection {} in room {}", conn, room),
            }
        }
        debug!("Broadcast to room {} reached {} connections", room, delivered);
        delivered
    }
}
