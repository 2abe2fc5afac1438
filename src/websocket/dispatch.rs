//! Routes decoded client frames to the lobby and game coordinators.

use actix_web::web;
use log::{debug, info, warn};

use super::rooms::ConnId;
use crate::error::Result;
use crate::models::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// Parses one inbound frame. Undecodable frames yield `None` and are dropped.
pub fn decode(text: &str) -> Option<ClientMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("Dropping undecodable frame: {}", e);
            None
        }
    }
}

/// Handles one client message and returns the reply meant for the sender
/// alone, if any. Failures become an `error` reply; room-wide updates are
/// broadcast by the coordinators themselves.
pub async fn dispatch(app: web::Data<AppState>, conn: ConnId, msg: ClientMessage) -> Option<ServerMessage> {
    match route(&app, conn, msg).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!("Connection {} request rejected: {}", conn, err);
            Some(ServerMessage::from(&err))
        }
    }
}

async fn route(app: &AppState, conn: ConnId, msg: ClientMessage) -> Result<Option<ServerMessage>> {
    match msg {
        // Joining binds this connection to a lobby and player
        ClientMessage::Join { lobby_id, player } => {
            let lobby = app.lobbies().join(&lobby_id, player, Some(conn)).await?;
            Ok(Some(ServerMessage::Joined { lobby }))
        }
        // Lobby messages act for whoever this connection joined as
        ClientMessage::Role { selection } => {
            let session = app.session(conn)?;
            app.lobbies()
                .select_role(&session.lobby_id, &session.player_id, selection)
                .await?;
            Ok(None)
        }
        ClientMessage::Start => {
            let session = app.session(conn)?;
            app.lobbies()
                .start_game(&session.lobby_id, &session.player_id)
                .await?;
            Ok(None)
        }
        ClientMessage::Heartbeat => {
            let session = app.session(conn)?;
            app.lobbies()
                .heartbeat(&session.lobby_id, &session.player_id)
                .await?;
            Ok(None)
        }
        // Game messages name their game and player explicitly
        ClientMessage::JoinGame { game_id, player } => {
            let game = app.games().join_game(&game_id, player, Some(conn)).await?;
            Ok(Some(ServerMessage::Game { game }))
        }
        ClientMessage::SelectPiece {
            game_id,
            player_id,
            piece,
        } => {
            app.games().select_piece(&game_id, &player_id, &piece).await?;
            Ok(None)
        }
        ClientMessage::MakeMove {
            game_id,
            player_id,
            from,
            to,
            promotion,
        } => {
            app.games()
                .make_move(&game_id, &player_id, &from, &to, promotion.as_deref())
                .await?;
            Ok(None)
        }
    }
}

/// Connection teardown: forget the connection, then treat the player as
/// having abandoned the lobby unless another live connection speaks for them.
pub async fn disconnect(app: web::Data<AppState>, conn: ConnId) {
    app.rooms.unregister(conn);
    let Some(session) = app.sessions.remove(conn) else {
        debug!("Connection {} closed without joining", conn);
        return;
    };

    if app
        .sessions
        .has_other(&session.lobby_id, &session.player_id, conn)
    {
        info!(
            "Player {} still connected to lobby {} elsewhere, keeping seat",
            session.player_id, session.lobby_id
        );
        return;
    }

    if let Err(e) = app
        .lobbies()
        .remove_player(&session.lobby_id, &session.player_id)
        .await
    {
        warn!(
            "Cleanup for {} in lobby {} failed: {}",
            session.player_id, session.lobby_id, e
        );
    }
}
