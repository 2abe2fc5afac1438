//! Thin adapter over the `chess` crate: legality, notation and
//! terminal-state classification for positions stored as FEN strings.

use std::fmt;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Rank, Square};
use thiserror::Error;

use super::material::has_insufficient_material;
use crate::models::{EndReason, PieceKind, Team};

/// Half-moves without a capture or pawn move that end the game.
const FIFTY_MOVE_PLIES: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("not a square: {0:?}")]
    BadSquare(String),
    #[error("unreadable position: {0}")]
    BadPosition(String),
    #[error("{0}")]
    Illegal(String),
}

/// Result of a legal move.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub position: Position,
    pub san: String,
    pub uci: String,
}

/// How a finished game ended; `winner` is `None` for draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub reason: EndReason,
    pub winner: Option<Team>,
}

/// A board plus the move counters the `chess` crate does not track.
#[derive(Clone)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Position {
    pub fn initial() -> Self {
        Position {
            board: Board::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let board = Board::from_str(fen).map_err(|e| RulesError::BadPosition(format!("{e:?}")))?;
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let halfmove_clock = fields.get(4).and_then(|f| f.parse().ok()).unwrap_or(0);
        let fullmove_number = fields
            .get(5)
            .and_then(|f| f.parse().ok())
            .unwrap_or(1)
            .max(1);
        Ok(Position {
            board,
            halfmove_clock,
            fullmove_number,
        })
    }

    pub fn fen(&self) -> String {
        format!(
            "{} {} {}",
            self.repetition_key(),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Placement, side to move, castling rights and en passant target.
    fn repetition_key(&self) -> String {
        let rendered = self.board.to_string();
        rendered.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn side_to_move(&self) -> Team {
        team_of(self.board.side_to_move())
    }

    pub fn piece_at(&self, square: Square) -> Option<(Team, PieceKind)> {
        let piece = self.board.piece_on(square)?;
        let color = self.board.color_on(square)?;
        Some((team_of(color), kind_of(piece)))
    }

    /// Legal moves for the side to move that start from a piece of `kind`.
    pub fn legal_moves_of(&self, kind: PieceKind) -> Vec<ChessMove> {
        let wanted = piece_of(kind);
        MoveGen::new_legal(&self.board)
            .filter(|m| self.board.piece_on(m.get_source()) == Some(wanted))
            .collect()
    }

    /// Whether moving from `from` to `to` lands a pawn on its last rank.
    pub fn is_promotion(&self, from: Square, to: Square) -> bool {
        let last = match self.board.side_to_move() {
            Color::White => Rank::Eighth,
            Color::Black => Rank::First,
        };
        self.board.piece_on(from) == Some(Piece::Pawn) && to.get_rank() == last
    }

    pub fn apply(
        &self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<AppliedMove, RulesError> {
        let mv = ChessMove::new(from, to, promotion.map(piece_of));
        if !self.board.legal(mv) {
            return Err(RulesError::Illegal(format!("{from}{to} is not legal here")));
        }

        let moved = self.board.piece_on(from).ok_or_else(|| {
            RulesError::Illegal(format!("no piece on {from}"))
        })?;
        let captures = self.is_capture(mv);
        let mut san = self.san_body(mv);

        let board = self.board.make_move_new(mv);
        if board.status() == BoardStatus::Checkmate {
            san.push('#');
        } else if board.checkers().popcnt() > 0 {
            san.push('+');
        }

        let halfmove_clock = if moved == Piece::Pawn || captures {
            0
        } else {
            self.halfmove_clock + 1
        };
        let fullmove_number = match self.board.side_to_move() {
            Color::Black => self.fullmove_number + 1,
            Color::White => self.fullmove_number,
        };

        Ok(AppliedMove {
            position: Position {
                board,
                halfmove_clock,
                fullmove_number,
            },
            san,
            uci: uci_of(mv),
        })
    }

    /// Applies coordinate-notation moves from this position, returning every
    /// position passed through, starting with `self`.
    pub fn replay(&self, uci_moves: &[String]) -> Result<Vec<Position>, RulesError> {
        let mut positions = vec![self.clone()];
        let mut current = self.clone();
        for uci in uci_moves {
            let (from, to, promotion) = parse_uci(uci)?;
            current = current.apply(from, to, promotion)?.position;
            positions.push(current.clone());
        }
        Ok(positions)
    }

    /// Terminal classification with precedence checkmate, stalemate,
    /// threefold repetition, insufficient material, fifty-move rule.
    /// `history` holds earlier positions of the same game.
    pub fn outcome(&self, history: &[Position]) -> Option<Outcome> {
        match self.board.status() {
            BoardStatus::Checkmate => {
                return Some(Outcome {
                    reason: EndReason::Checkmate,
                    winner: Some(self.side_to_move().opponent()),
                })
            }
            BoardStatus::Stalemate => return Some(draw(EndReason::Stalemate)),
            BoardStatus::Ongoing => {}
        }

        let key = self.repetition_key();
        let seen = history
            .iter()
            .filter(|p| p.repetition_key() == key)
            .count();
        if seen + 1 >= 3 {
            return Some(draw(EndReason::ThreefoldRepetition));
        }
        if has_insufficient_material(&self.board) {
            return Some(draw(EndReason::InsufficientMaterial));
        }
        if self.halfmove_clock >= FIFTY_MOVE_PLIES {
            return Some(draw(EndReason::FiftyMoveRule));
        }
        None
    }

    fn is_capture(&self, mv: ChessMove) -> bool {
        if self.board.piece_on(mv.get_dest()).is_some() {
            return true;
        }
        // En passant: a pawn changing file onto an empty square.
        self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
    }

    /// SAN without the check suffix.
    fn san_body(&self, mv: ChessMove) -> String {
        let from = mv.get_source();
        let to = mv.get_dest();
        let piece = match self.board.piece_on(from) {
            Some(piece) => piece,
            None => return uci_of(mv),
        };

        if piece == Piece::King {
            let from_file = from.get_file().to_index() as i32;
            let to_file = to.get_file().to_index() as i32;
            match to_file - from_file {
                2 => return "O-O".to_string(),
                -2 => return "O-O-O".to_string(),
                _ => {}
            }
        }

        let captures = self.is_capture(mv);
        let mut san = String::new();

        if piece == Piece::Pawn {
            if captures {
                san.push(file_char(from));
                san.push('x');
            }
            san.push_str(&to.to_string());
            if let Some(promo) = mv.get_promotion() {
                san.push('=');
                san.push(kind_of(promo).letter());
            }
            return san;
        }

        san.push(kind_of(piece).letter());

        let rivals: Vec<Square> = MoveGen::new_legal(&self.board)
            .filter(|m| {
                m.get_dest() == to
                    && m.get_source() != from
                    && self.board.piece_on(m.get_source()) == Some(piece)
            })
            .map(|m| m.get_source())
            .collect();
        if !rivals.is_empty() {
            let shares_file = rivals.iter().any(|s| s.get_file() == from.get_file());
            let shares_rank = rivals.iter().any(|s| s.get_rank() == from.get_rank());
            if !shares_file {
                san.push(file_char(from));
            } else if !shares_rank {
                san.push(rank_char(from));
            } else {
                san.push(file_char(from));
                san.push(rank_char(from));
            }
        }

        if captures {
            san.push('x');
        }
        san.push_str(&to.to_string());
        san
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.fen())
    }
}

fn draw(reason: EndReason) -> Outcome {
    Outcome {
        reason,
        winner: None,
    }
}

pub fn parse_square(raw: &str) -> Result<Square, RulesError> {
    Square::from_str(&raw.trim().to_lowercase()).map_err(|_| RulesError::BadSquare(raw.to_string()))
}

/// Parses `e2e4` / `e7e8q`.
pub fn parse_uci(raw: &str) -> Result<(Square, Square, Option<PieceKind>), RulesError> {
    let raw = raw.trim();
    if !raw.is_ascii() || !(4..=5).contains(&raw.len()) {
        return Err(RulesError::BadSquare(raw.to_string()));
    }
    let from = parse_square(&raw[0..2])?;
    let to = parse_square(&raw[2..4])?;
    let promotion = match raw.get(4..5) {
        Some(letter) => Some(
            letter
                .parse::<PieceKind>()
                .map_err(|_| RulesError::BadSquare(raw.to_string()))?,
        ),
        None => None,
    };
    Ok((from, to, promotion))
}

fn uci_of(mv: ChessMove) -> String {
    let mut uci = format!("{}{}", mv.get_source(), mv.get_dest());
    if let Some(promo) = mv.get_promotion() {
        uci.push(kind_of(promo).letter().to_ascii_lowercase());
    }
    uci
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

pub fn team_of(color: Color) -> Team {
    match color {
        Color::White => Team::White,
        Color::Black => Team::Black,
    }
}

pub fn kind_of(piece: Piece) -> PieceKind {
    match piece {
        Piece::King => PieceKind::King,
        Piece::Queen => PieceKind::Queen,
        Piece::Rook => PieceKind::Rook,
        Piece::Bishop => PieceKind::Bishop,
        Piece::Knight => PieceKind::Knight,
        Piece::Pawn => PieceKind::Pawn,
    }
}

fn piece_of(kind: PieceKind) -> Piece {
    match kind {
        PieceKind::King => Piece::King,
        PieceKind::Queen => Piece::Queen,
        PieceKind::Rook => Piece::Rook,
        PieceKind::Bishop => Piece::Bishop,
        PieceKind::Knight => Piece::Knight,
        PieceKind::Pawn => Piece::Pawn,
    }
}
