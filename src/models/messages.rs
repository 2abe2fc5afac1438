use actix::Message;
use serde::{Deserialize, Serialize};

use super::game_state::{GameState, PieceKind};
use super::lobby::{Lobby, PlayerInfo};
use super::roles::{Role, Slot, Team};
use crate::error::HandBrainError;

/// A requested seat, or `None` to become a spectator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSelection {
    pub team: Team,
    pub role: Role,
}

impl From<RoleSelection> for Slot {
    fn from(sel: RoleSelection) -> Self {
        Slot::new(sel.team, sel.role)
    }
}

/// Frames a client sends, discriminated by `type`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Join { lobby_id: String, player: PlayerInfo },
    Role {
        #[serde(default)]
        selection: Option<RoleSelection>,
    },
    Start,
    Heartbeat,
    #[serde(rename_all = "camelCase")]
    JoinGame { game_id: String, player: PlayerInfo },
    /// `piece` stays a raw string so an unknown kind is answered with an
    /// error instead of being dropped as an undecodable frame.
    #[serde(rename_all = "camelCase")]
    SelectPiece {
        game_id: String,
        player_id: String,
        piece: String,
    },
    #[serde(rename_all = "camelCase")]
    MakeMove {
        game_id: String,
        player_id: String,
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
}

/// Frames the server sends, discriminated by `type`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Joined { lobby: Lobby },
    Lobby { lobby: Lobby },
    #[serde(rename_all = "camelCase")]
    Start { game_id: String },
    Game { game: GameState },
    #[serde(rename_all = "camelCase")]
    PieceSelected {
        game_id: String,
        piece: PieceKind,
        next_actor: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        error: String,
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<i64>,
    },
}

impl From<&HandBrainError> for ServerMessage {
    fn from(err: &HandBrainError) -> Self {
        ServerMessage::Error {
            error: err.to_string(),
            code: err.code().to_string(),
            retry_after_ms: err.retry_after_ms(),
        }
    }
}

/// A serialized frame queued for delivery to one connection.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct OutboundFrame(pub String);
