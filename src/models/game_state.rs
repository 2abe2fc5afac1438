use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::roles::{RoleSlots, Team};

/// The six piece kinds a Hand may call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    #[serde(rename = "K")]
    King,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "R")]
    Rook,
    #[serde(rename = "B")]
    Bishop,
    #[serde(rename = "N")]
    Knight,
    #[serde(rename = "P")]
    Pawn,
}

impl PieceKind {
    pub fn letter(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for PieceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "K" => Ok(PieceKind::King),
            "Q" => Ok(PieceKind::Queen),
            "R" => Ok(PieceKind::Rook),
            "B" => Ok(PieceKind::Bishop),
            "N" => Ok(PieceKind::Knight),
            "P" => Ok(PieceKind::Pawn),
            _ => Err(format!("unknown piece kind {s:?}")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Active,
    Paused,
    WhiteWon,
    BlackWon,
    Draw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::WhiteWon | GameStatus::BlackWon | GameStatus::Draw)
    }
}

/// Why a game ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
}

/// Who sits where once the game is running.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GamePlayers {
    #[serde(flatten)]
    pub roles: RoleSlots,
    #[serde(default)]
    pub observers: Vec<String>,
}

/// Clock fields are carried for clients but not ticked by the server.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Clocks {
    pub white_ms: i64,
    pub black_ms: i64,
    #[serde(default)]
    pub last_tick_at: Option<i64>,
    #[serde(default)]
    pub running_for: Option<Team>,
}

/// Authoritative record of an in-progress or finished game.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: String,
    pub lobby_id: String,
    pub fen: String,
    pub move_number: u32,
    pub turn: Team,
    /// `None` while waiting on the Hand, `Some` while the Brain is to move.
    #[serde(default)]
    pub selected_piece: Option<PieceKind>,
    pub players: GamePlayers,
    #[serde(default)]
    pub player_names: HashMap<String, String>,
    #[serde(default)]
    pub clocks: Clocks,
    pub created_at: i64,
    pub status: GameStatus,
    #[serde(default)]
    pub end_reason: Option<EndReason>,
    /// Standard algebraic notation, one entry per ply.
    #[serde(default)]
    pub moves: Vec<String>,
    /// Coordinate notation parallel to `moves`.
    #[serde(default)]
    pub uci_moves: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roles::{Role, Slot};
    use serde_json::json;

    #[test]
    fn piece_kind_parses_case_insensitively() {
        assert_eq!("n".parse::<PieceKind>(), Ok(PieceKind::Knight));
        assert_eq!("P".parse::<PieceKind>(), Ok(PieceKind::Pawn));
        assert!("X".parse::<PieceKind>().is_err());
        assert!("".parse::<PieceKind>().is_err());
    }

    #[test]
    fn wire_shape_uses_canonical_names() {
        let mut roles = RoleSlots::default();
        roles.assign(Slot::new(Team::White, Role::Hand), "a");
        let game = GameState {
            id: "g".into(),
            lobby_id: "g".into(),
            fen: "8/8/8/8/8/8/8/8 w - - 0 1".into(),
            move_number: 0,
            turn: Team::White,
            selected_piece: Some(PieceKind::Knight),
            players: GamePlayers {
                roles,
                observers: vec!["z".into()],
            },
            player_names: HashMap::new(),
            clocks: Clocks::default(),
            created_at: 0,
            status: GameStatus::WhiteWon,
            end_reason: Some(EndReason::Checkmate),
            moves: vec![],
            uci_moves: vec![],
        };

        let value = serde_json::to_value(&game).unwrap();
        assert_eq!(value["selectedPiece"], json!("N"));
        assert_eq!(value["turn"], json!("WHITE"));
        assert_eq!(value["status"], json!("WHITE_WON"));
        assert_eq!(value["players"]["whiteHand"], json!("a"));
        assert_eq!(value["players"]["observers"], json!(["z"]));
        assert_eq!(value["endReason"], json!("CHECKMATE"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!GameStatus::Active.is_terminal());
        assert!(!GameStatus::Paused.is_terminal());
        assert!(GameStatus::Draw.is_terminal());
    }
}
