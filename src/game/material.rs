use chess::{Board, Color, Piece, Square};

/// Whether neither side can possibly deliver mate: bare kings, a single
/// minor piece against a bare king, or one bishop each on the same colour.
pub fn has_insufficient_material(board: &Board) -> bool {
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    let knights = *board.pieces(Piece::Knight);
    let bishops = *board.pieces(Piece::Bishop);
    let minors = knights.popcnt() + bishops.popcnt();

    match minors {
        0 | 1 => true,
        2 if knights.popcnt() == 0 => {
            let white = bishops & *board.color_combined(Color::White);
            let black = bishops & *board.color_combined(Color::Black);
            if white.popcnt() != 1 || black.popcnt() != 1 {
                return false;
            }
            let shade = |bb: chess::BitBoard| bb.into_iter().next().map(square_shade);
            shade(white) == shade(black)
        }
        _ => false,
    }
}

fn square_shade(square: Square) -> usize {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn board(fen: &str) -> Board {
        Board::from_str(fen).unwrap()
    }

    #[test]
    fn bare_kings() {
        assert!(has_insufficient_material(&board("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
    }

    #[test]
    fn single_minor_piece() {
        assert!(has_insufficient_material(&board("4k3/8/8/8/8/8/8/4K1N1 w - - 0 1")));
        assert!(has_insufficient_material(&board("4k3/8/8/8/8/8/8/2b1K3 w - - 0 1")));
    }

    #[test]
    fn same_coloured_bishops() {
        // c1 and f8 are both dark squares.
        assert!(has_insufficient_material(&board("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1")));
        // c1 dark, c8 light.
        assert!(!has_insufficient_material(&board("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1")));
    }

    #[test]
    fn mating_material_remains() {
        assert!(!has_insufficient_material(&board("4k3/8/8/8/8/8/8/R3K3 w - - 0 1")));
        assert!(!has_insufficient_material(&board("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
        assert!(!has_insufficient_material(&board("4k3/8/8/8/8/8/8/2N1K1N1 w - - 0 1")));
    }
}
