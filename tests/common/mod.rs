#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use actix_web::web;
use async_trait::async_trait;
use uuid::Uuid;

use hand_brain_server::clock::ManualClock;
use hand_brain_server::config::LobbyRules;
use hand_brain_server::models::{Lobby, OutboundFrame, PlayerInfo, ServerMessage};
use hand_brain_server::store::{MemoryStore, StateStore, StoreError};
use hand_brain_server::websocket::{decode, dispatch, ConnId};
use hand_brain_server::AppState;

pub const T0: i64 = 1_700_000_000_000;

/// Stands in for a client socket: records every frame the server queues.
#[derive(Default)]
pub struct Collector {
    frames: Vec<ServerMessage>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<OutboundFrame> for Collector {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, _: &mut Context<Self>) {
        self.frames
            .push(serde_json::from_str(&msg.0).expect("server frames decode"));
    }
}

#[derive(Message)]
#[rtype(result = "Vec<ServerMessage>")]
pub struct Drain;

impl Handler<Drain> for Collector {
    type Result = MessageResult<Drain>;

    fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.frames))
    }
}

/// Memory store that gives up the executor around every access, so
/// concurrent handlers interleave between their read and their write.
#[derive(Default)]
pub struct YieldingStore {
    inner: MemoryStore,
}

#[async_trait]
impl StateStore for YieldingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        actix_rt::task::yield_now().await;
        let value = self.inner.get(key).await;
        actix_rt::task::yield_now().await;
        value
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.set(key, value, ttl).await
    }
}

pub struct Client {
    pub conn: ConnId,
    pub addr: Addr<Collector>,
}

impl Client {
    /// Everything broadcast to this client so far, oldest first.
    pub async fn drain(&self) -> Vec<ServerMessage> {
        self.addr.send(Drain).await.expect("collector alive")
    }
}

pub struct Harness {
    pub app: web::Data<AppState>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let app = AppState::new(Arc::new(YieldingStore::default()), clock.clone(), LobbyRules::default());
        Self {
            app: web::Data::new(app),
            clock,
        }
    }

    pub fn connect(&self) -> Client {
        let conn = Uuid::new_v4();
        let addr = Collector::default().start();
        self.app.rooms.register(conn, addr.clone().recipient());
        Client { conn, addr }
    }

    /// Pushes a JSON frame through the same decode/dispatch path a socket uses.
    pub async fn send(&self, client: &Client, frame: serde_json::Value) -> Option<ServerMessage> {
        let msg = decode(&frame.to_string()).expect("test frames decode");
        dispatch(self.app.clone(), client.conn, msg).await
    }

    pub async fn create_lobby(&self, host: &str) -> Lobby {
        self.app
            .lobbies()
            .create(player(host), 300, 2)
            .await
            .expect("lobby created")
    }
}

pub fn player(id: &str) -> PlayerInfo {
    PlayerInfo {
        id: id.to_string(),
        name: format!("Player {}", id.to_uppercase()),
    }
}
