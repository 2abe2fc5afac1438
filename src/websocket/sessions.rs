use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::rooms::ConnId;

/// What a live connection has identified itself as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub lobby_id: String,
    pub player_id: String,
    pub game_id: Option<String>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a lobby join. Any game binding from an earlier join is dropped.
    pub fn bind_lobby(&self, conn: ConnId, lobby_id: &str, player_id: &str) {
        self.insert(
            conn,
            Session {
                lobby_id: lobby_id.to_string(),
                player_id: player_id.to_string(),
                game_id: None,
            },
        );
    }

    /// Records a game join; games live in their originating lobby's room.
    pub fn bind_game(&self, conn: ConnId, lobby_id: &str, player_id: &str, game_id: &str) {
        self.insert(
            conn,
            Session {
                lobby_id: lobby_id.to_string(),
                player_id: player_id.to_string(),
                game_id: Some(game_id.to_string()),
            },
        );
    }

    fn insert(&self, conn: ConnId, session: Session) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conn, session);
    }

    pub fn get(&self, conn: ConnId) -> Option<Session> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conn)
            .cloned()
    }

    pub fn remove(&self, conn: ConnId) -> Option<Session> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conn)
    }

    /// Whether some connection other than `except` speaks for this player
    /// in this lobby.
    pub fn has_other(&self, lobby_id: &str, player_id: &str, except: ConnId) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(conn, s)| *conn != except && s.lobby_id == lobby_id && s.player_id == player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
