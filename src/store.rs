//! Key-value state store holding JSON lobby and game records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::error;
use thiserror::Error;

use crate::models::{GameState, Lobby};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),
}

/// Minimal surface the coordinators need from a persistence backend.
///
/// `set` with `ttl = None` leaves any expiry already attached to the key in
/// place, so a TTL stamped at creation survives later updates.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// Process-local store with lazy expiry on read.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;

        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Instant::now()),
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;

        let expires_at = match ttl {
            Some(ttl) => Some(Instant::now() + ttl),
            None => entries.get(key).and_then(|entry| entry.expires_at),
        };
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}

pub fn lobby_key(lobby_id: &str) -> String {
    format!("lobby:{lobby_id}")
}

pub fn game_key(game_id: &str) -> String {
    format!("game:{game_id}")
}

/// Typed JSON access to lobby and game records.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn StateStore>,
}

impl StoreClient {
    pub fn new(inner: Arc<dyn StateStore>) -> Self {
        Self { inner }
    }

    pub async fn get_lobby(&self, lobby_id: &str) -> crate::error::Result<Option<Lobby>> {
        self.get_json(&lobby_key(lobby_id)).await
    }

    pub async fn put_lobby(&self, lobby: &Lobby, ttl: Option<Duration>) -> crate::error::Result<()> {
        self.put_json(&lobby_key(&lobby.id), lobby, ttl).await
    }

    pub async fn get_game(&self, game_id: &str) -> crate::error::Result<Option<GameState>> {
        self.get_json(&game_key(game_id)).await
    }

    pub async fn put_game(&self, game: &GameState) -> crate::error::Result<()> {
        self.put_json(&game_key(&game.id), game, None).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> crate::error::Result<Option<T>> {
        let raw = self.inner.get(key).await.map_err(|e| {
            error!("Store read failed for {}: {}", key, e);
            e
        })?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> crate::error::Result<()> {
        let raw = serde_json::to_string(value)?;
        self.inner.set(key, raw, ttl).await.map_err(|e| {
            error!("Store write failed for {}: {}", key, e);
            e.into()
        })
    }
}
