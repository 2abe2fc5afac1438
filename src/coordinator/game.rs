use log::{info, warn};

use crate::error::{HandBrainError, Result};
use crate::game::rules::{parse_square, Position};
use crate::models::{
    Clocks, GamePlayers, GameState, GameStatus, Lobby, PieceKind, PlayerInfo, Role, ServerMessage,
    Slot, Team,
};
use crate::state::AppState;
use crate::store::game_key;
use crate::websocket::ConnId;

/// A fresh game for a lobby whose four seats are filled.
pub fn new_game(lobby: &Lobby, now_ms: i64) -> GameState {
    let observers = lobby
        .players
        .iter()
        .filter(|p| !lobby.roles.holds_any(&p.id))
        .map(|p| p.id.clone())
        .collect();

    GameState {
        id: lobby.id.clone(),
        lobby_id: lobby.id.clone(),
        fen: Position::initial().fen(),
        move_number: 0,
        turn: Team::White,
        selected_piece: None,
        players: GamePlayers {
            roles: lobby.roles.clone(),
            observers,
        },
        player_names: lobby.display_names(),
        clocks: Clocks::default(),
        created_at: now_ms,
        status: GameStatus::Active,
        end_reason: None,
        moves: Vec::new(),
        uci_moves: Vec::new(),
    }
}

/// Two-phase turns: the side's Hand names a piece kind, then its Brain
/// moves a piece of that kind.
pub struct GameCoordinator<'a> {
    app: &'a AppState,
}

impl<'a> GameCoordinator<'a> {
    pub fn new(app: &'a AppState) -> Self {
        Self { app }
    }

    pub async fn get(&self, game_id: &str) -> Result<GameState> {
        self.app
            .store
            .get_game(game_id)
            .await?
            .ok_or_else(|| HandBrainError::NotFound(format!("game {game_id}")))
    }

    /// Returns the snapshot; with a connection, subscribes it to the room of
    /// the lobby the game came from.
    pub async fn join_game(&self, game_id: &str, player: PlayerInfo, conn: Option<ConnId>) -> Result<GameState> {
        let game = self.get(game_id).await?;
        if let Some(conn) = conn {
            self.app.rooms.join(&game.lobby_id, conn);
            self.app
                .sessions
                .bind_game(conn, &game.lobby_id, &player.id, &game.id);
            info!("Player {} watching game {}", player.id, game.id);
        }
        Ok(game)
    }

    pub async fn select_piece(&self, game_id: &str, player_id: &str, piece: &str) -> Result<GameState> {
        let _guard = self.app.locks.lock(&game_key(game_id)).await;
        let mut game = self.get(game_id).await?;
        require_active(&game)?;

        let hand = Slot::new(game.turn, Role::Hand);
        if game.players.roles.get(hand) != Some(player_id) {
            return Err(HandBrainError::Forbidden(format!("waiting on {hand}")));
        }
        if let Some(selected) = game.selected_piece {
            return Err(HandBrainError::Conflict(format!("{selected} is already selected")));
        }
        let kind: PieceKind = piece.parse().map_err(HandBrainError::InvalidInput)?;

        let position = Position::from_fen(&game.fen)?;
        if position.legal_moves_of(kind).is_empty() {
            return Err(HandBrainError::Precondition(format!("no legal {kind} moves")));
        }

        game.selected_piece = Some(kind);
        self.app.store.put_game(&game).await?;

        let brain = Slot::new(game.turn, Role::Brain);
        info!("Game {}: {} selected {}", game.id, hand, kind);
        self.app.rooms.broadcast(
            &game.lobby_id,
            &ServerMessage::PieceSelected {
                game_id: game.id.clone(),
                piece: kind,
                next_actor: brain.to_string(),
            },
        );
        Ok(game)
    }

    pub async fn make_move(
        &self,
        game_id: &str,
        player_id: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<GameState> {
        let _guard = self.app.locks.lock(&game_key(game_id)).await;
        let mut game = self.get(game_id).await?;
        require_active(&game)?;

        // Phase and actor: the Hand must have chosen, and only that side's Brain moves
        let selected = game
            .selected_piece
            .ok_or_else(|| HandBrainError::Precondition("no piece has been selected".into()))?;
        let brain = Slot::new(game.turn, Role::Brain);
        if game.players.roles.get(brain) != Some(player_id) {
            return Err(HandBrainError::Forbidden(format!("waiting on {brain}")));
        }

        // The origin square must hold a piece of the mover's colour and selected kind
        let position = Position::from_fen(&game.fen)?;
        let from_sq = parse_square(from)?;
        let to_sq = parse_square(to)?;
        match position.piece_at(from_sq) {
            None => return Err(HandBrainError::InvalidInput(format!("no piece on {from_sq}"))),
            Some((team, _)) if team != game.turn => {
                return Err(HandBrainError::InvalidInput(format!(
                    "the piece on {from_sq} is not yours"
                )))
            }
            Some((_, kind)) if kind != selected => {
                return Err(HandBrainError::InvalidInput(format!(
                    "{selected} was selected, not {kind}"
                )))
            }
            Some(_) => {}
        }

        // A promotion field on an ordinary move is ignored.
        let promotion = if position.is_promotion(from_sq, to_sq) {
            Some(parse_promotion(promotion)?)
        } else {
            None
        };

        // Earlier positions, for repetition counting
        let history = match Position::initial().replay(&game.uci_moves) {
            Ok(history) => history,
            Err(e) => {
                warn!("Game {} history does not replay ({}), ignoring repetitions", game.id, e);
                Vec::new()
            }
        };

        // Apply the move and reset the phase
        let applied = position.apply(from_sq, to_sq, promotion)?;
        game.fen = applied.position.fen();
        game.move_number += 1;
        game.selected_piece = None;
        game.moves.push(applied.san.clone());
        game.uci_moves.push(applied.uci);

        // Terminal: record the result and keep the turn. Otherwise pass the turn
        match applied.position.outcome(&history) {
            Some(outcome) => {
                game.status = match outcome.winner {
                    Some(Team::White) => GameStatus::WhiteWon,
                    Some(Team::Black) => GameStatus::BlackWon,
                    None => GameStatus::Draw,
                };
                game.end_reason = Some(outcome.reason);
                info!(
                    "Game {} over after {}: {:?} ({:?})",
                    game.id, applied.san, game.status, outcome.reason
                );
            }
            None => {
                game.turn = game.turn.opponent();
                info!("Game {}: {} played {}", game.id, brain, applied.san);
            }
        }

        // Persist, then send the full snapshot to the room
        self.app.store.put_game(&game).await?;
        self.app
            .rooms
            .broadcast(&game.lobby_id, &ServerMessage::Game { game: game.clone() });
        Ok(game)
    }
}

fn require_active(game: &GameState) -> Result<()> {
    if game.status == GameStatus::Active {
        Ok(())
    } else {
        Err(HandBrainError::Precondition(format!(
            "game {} is {:?}",
            game.id, game.status
        )))
    }
}

/// Queen unless the client asked for another officer.
fn parse_promotion(raw: Option<&str>) -> Result<PieceKind> {
    let kind = match raw {
        None => return Ok(PieceKind::Queen),
        Some(raw) => raw.parse::<PieceKind>().map_err(HandBrainError::InvalidInput)?,
    };
    match kind {
        PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight => Ok(kind),
        _ => Err(HandBrainError::InvalidInput(format!("cannot promote to {kind}"))),
    }
}
