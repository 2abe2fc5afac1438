use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::LobbyRules;
use crate::coordinator::{GameCoordinator, KeyLocks, LobbyCoordinator};
use crate::error::{HandBrainError, Result};
use crate::store::{MemoryStore, StateStore, StoreClient};
use crate::websocket::{ConnId, RoomBroadcaster, Session, SessionRegistry};

/// Application state shared between connections. Created once per process
/// (or per test) and handed to every handler.
pub struct AppState {
    pub store: StoreClient,
    pub rooms: RoomBroadcaster,
    pub sessions: SessionRegistry,
    pub locks: KeyLocks,
    pub clock: Arc<dyn Clock>,
    pub rules: LobbyRules,
}

impl AppState {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>, rules: LobbyRules) -> Self {
        Self {
            store: StoreClient::new(store),
            rooms: RoomBroadcaster::new(),
            sessions: SessionRegistry::new(),
            locks: KeyLocks::new(),
            clock,
            rules,
        }
    }

    /// In-memory store and wall clock.
    pub fn in_memory(rules: LobbyRules) -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), rules)
    }

    pub fn lobbies(&self) -> LobbyCoordinator<'_> {
        LobbyCoordinator::new(self)
    }

    pub fn games(&self) -> GameCoordinator<'_> {
        GameCoordinator::new(self)
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// The session bound to `conn`, or an error telling the client to join first.
    pub fn session(&self, conn: ConnId) -> Result<Session> {
        self.sessions
            .get(conn)
            .ok_or_else(|| HandBrainError::Precondition("join a lobby first".into()))
    }
}
