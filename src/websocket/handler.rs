use std::time::{Duration, Instant};

use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use uuid::Uuid;

use super::dispatch::{decode, disconnect, dispatch};
use super::rooms::ConnId;
use crate::models::OutboundFrame;
use crate::state::AppState;

/// How often we ping the client.
const PING_INTERVAL: Duration = Duration::from_secs(10);
/// Connections silent for this long are closed.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One player's (or spectator's) WebSocket connection.
pub struct PlayerSocket {
    pub id: ConnId,
    pub app_state: web::Data<AppState>,
    last_heard: Instant,
}

impl PlayerSocket {
    pub fn new(app_state: web::Data<AppState>) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_state,
            last_heard: Instant::now(),
        }
    }

    fn start_liveness_check(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(PING_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heard) > CLIENT_TIMEOUT {
                warn!("Connection {} timed out", act.id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Messages are handled one at a time: `wait` holds back further frames
    /// and mailbox deliveries until the reply has been written.
    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(msg) = decode(text) else {
            return;
        };
        let fut = dispatch(self.app_state.clone(), self.id, msg);
        ctx.wait(fut.into_actor(self).map(|reply, act, ctx| {
            let Some(reply) = reply else {
                return;
            };
            match serde_json::to_string(&reply) {
                Ok(text) => ctx.text(text),
                Err(e) => warn!("Failed to serialize reply for {}: {}", act.id, e),
            }
        }));
    }
}

impl Actor for PlayerSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        // Make this connection reachable for room broadcasts
        let recipient = ctx.address().recipient();
        self.app_state.rooms.register(self.id, recipient);
        self.start_liveness_check(ctx);
        info!("WebSocket connection started: {}", self.id);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        info!("WebSocket connection closed: {}", self.id);
        // Store cleanup runs detached from the stopped actor
        actix::spawn(disconnect(self.app_state.clone(), self.id));
    }
}

impl Handler<OutboundFrame> for PlayerSocket {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlayerSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heard = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Ping(msg)) => {
                self.last_heard = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heard = Instant::now();
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Connection {} sent a binary frame, ignoring", self.id);
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection {} closing: {:?}", self.id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                warn!("Connection {} protocol error: {}", self.id, e);
                ctx.stop();
            }
        }
    }
}

/// Upgrades `GET /ws` to a WebSocket.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let socket = PlayerSocket::new(app_state);
    info!("New WebSocket connection: {}", socket.id);
    ws::start(socket, &req, stream)
}
