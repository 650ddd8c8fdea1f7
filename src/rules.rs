//! Per-piece movement rules.
//!
//! Legality here is purely geometric: a move is legal if the piece may travel from origin
//! to destination on the given board. Leaving one's own general exposed is not checked;
//! the game ends when a general is captured.

use crate::board::Board;
use crate::location::Position;
use crate::piece::{PieceKind, Side};

const PALACE_COLS: std::ops::RangeInclusive<i8> = 3..=5;

fn in_palace(side: Side, position: Position) -> bool {
    let rows = match side {
        Side::Red => 7..=9,
        Side::Black => 0..=2,
    };
    rows.contains(&position.row()) && PALACE_COLS.contains(&position.col())
}

/// Whether `position` lies on `side`'s own half of the river.
fn on_home_side(side: Side, position: Position) -> bool {
    match side {
        Side::Red => position.row() >= 5,
        Side::Black => position.row() <= 4,
    }
}

/// Number of pieces strictly between two cells sharing a row or column.
fn count_between(board: &Board, from: Position, to: Position) -> Option<usize> {
    if from.row() != to.row() && from.col() != to.col() {
        return None;
    }

    let rows = (to.row() - from.row()).signum();
    let cols = (to.col() - from.col()).signum();
    let mut count = 0;
    let mut current = from.shift(rows, cols)?;

    while current != to {
        if board[current].is_some() {
            count += 1;
        }
        current = current.shift(rows, cols)?;
    }

    Some(count)
}

pub fn is_legal(board: &Board, side: Side, from: Position, to: Position) -> bool {
    // Bounds on `to` hold by construction of `Position`.
    let Some(piece) = board[from] else {
        return false;
    };

    if piece.side != side {
        return false;
    }

    if board[to].is_some_and(|target| target.side == side) {
        return false;
    }

    let rows = to.row() - from.row();
    let cols = to.col() - from.col();

    match piece.kind {
        PieceKind::General => in_palace(side, to) && rows.abs() + cols.abs() == 1,
        PieceKind::Advisor => in_palace(side, to) && rows.abs() == 1 && cols.abs() == 1,
        PieceKind::Elephant => {
            on_home_side(side, to)
                && rows.abs() == 2
                && cols.abs() == 2
                && from.shift(rows / 2, cols / 2).is_some_and(|eye| board[eye].is_none())
        }
        PieceKind::Horse => {
            let leg = match (rows.abs(), cols.abs()) {
                (2, 1) => from.shift(rows.signum(), 0),
                (1, 2) => from.shift(0, cols.signum()),
                _ => return false,
            };
            leg.is_some_and(|leg| board[leg].is_none())
        }
        PieceKind::Chariot => count_between(board, from, to) == Some(0),
        PieceKind::Cannon => {
            let screens = if board[to].is_some() { 1 } else { 0 };
            count_between(board, from, to) == Some(screens)
        }
        PieceKind::Soldier => {
            let forward = rows == side.forward() && cols == 0;
            let sideways = rows == 0 && cols.abs() == 1;
            forward || (sideways && !on_home_side(side, from))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;

    fn at(row: i8, col: i8) -> Position {
        Position::new(row, col).unwrap()
    }

    fn place(board: &mut Board, row: i8, col: i8, kind: PieceKind, side: Side) {
        board.set(at(row, col), Some(Piece::new(kind, side)));
    }

    fn destinations(board: &Board, side: Side, from: Position) -> Vec<Position> {
        Position::all().filter(|&to| is_legal(board, side, from, to)).collect()
    }

    #[test]
    fn requires_own_piece_and_no_self_capture() {
        let board = Board::opening();
        assert!(!is_legal(&board, Side::Red, at(4, 4), at(5, 4)));
        assert!(!is_legal(&board, Side::Black, at(6, 0), at(5, 0)));
        assert!(!is_legal(&board, Side::Red, at(9, 0), at(9, 1)));
        assert!(!is_legal(&board, Side::Red, at(9, 0), at(9, 0)));
        assert!(is_legal(&board, Side::Red, at(6, 0), at(5, 0)));
    }

    #[test]
    fn general_stays_in_palace() {
        let mut board = Board::new();
        place(&mut board, 7, 3, PieceKind::General, Side::Red);
        assert_eq!(destinations(&board, Side::Red, at(7, 3)), vec![at(7, 4), at(8, 3)]);

        place(&mut board, 1, 4, PieceKind::General, Side::Black);
        assert_eq!(
            destinations(&board, Side::Black, at(1, 4)),
            vec![at(0, 4), at(1, 3), at(1, 5), at(2, 4)]
        );
    }

    #[test]
    fn advisor_moves_diagonally_in_palace() {
        let mut board = Board::new();
        place(&mut board, 9, 3, PieceKind::Advisor, Side::Red);
        assert_eq!(destinations(&board, Side::Red, at(9, 3)), vec![at(8, 4)]);

        place(&mut board, 8, 4, PieceKind::Advisor, Side::Red);
        assert_eq!(
            destinations(&board, Side::Red, at(8, 4)),
            vec![at(7, 3), at(7, 5), at(9, 5)]
        );
    }

    #[test]
    fn elephant_blocked_by_eye_and_river() {
        let mut board = Board::new();
        place(&mut board, 5, 2, PieceKind::Elephant, Side::Red);
        assert_eq!(destinations(&board, Side::Red, at(5, 2)), vec![at(7, 0), at(7, 4)]);

        place(&mut board, 6, 3, PieceKind::Soldier, Side::Black);
        assert_eq!(destinations(&board, Side::Red, at(5, 2)), vec![at(7, 0)]);

        place(&mut board, 4, 2, PieceKind::Elephant, Side::Black);
        assert_eq!(destinations(&board, Side::Black, at(4, 2)), vec![at(2, 0), at(2, 4)]);
    }

    #[test]
    fn horse_blocked_by_leg() {
        let mut board = Board::new();
        place(&mut board, 4, 4, PieceKind::Horse, Side::Red);
        assert_eq!(destinations(&board, Side::Red, at(4, 4)).len(), 8);

        place(&mut board, 3, 4, PieceKind::Soldier, Side::Red);
        let moves = destinations(&board, Side::Red, at(4, 4));
        assert_eq!(moves.len(), 6);
        assert!(!moves.contains(&at(2, 3)) && !moves.contains(&at(2, 5)));
        assert!(moves.contains(&at(3, 2)) && moves.contains(&at(3, 6)));
    }

    #[test]
    fn chariot_stops_at_first_piece() {
        let mut board = Board::new();
        place(&mut board, 5, 0, PieceKind::Chariot, Side::Red);
        place(&mut board, 2, 0, PieceKind::Horse, Side::Black);
        place(&mut board, 5, 3, PieceKind::Horse, Side::Red);

        let moves = destinations(&board, Side::Red, at(5, 0));
        assert!(moves.contains(&at(2, 0)));
        assert!(!moves.contains(&at(1, 0)));
        assert!(moves.contains(&at(5, 2)));
        assert!(!moves.contains(&at(5, 3)));
        assert!(moves.contains(&at(9, 0)));
        assert!(!moves.contains(&at(6, 1)));
    }

    #[test]
    fn cannon_needs_exactly_one_screen_to_capture() {
        let mut board = Board::new();
        place(&mut board, 7, 1, PieceKind::Cannon, Side::Red);
        place(&mut board, 0, 1, PieceKind::Horse, Side::Black);
        assert!(!is_legal(&board, Side::Red, at(7, 1), at(0, 1)));
        assert!(is_legal(&board, Side::Red, at(7, 1), at(1, 1)));

        place(&mut board, 3, 1, PieceKind::Soldier, Side::Black);
        assert!(is_legal(&board, Side::Red, at(7, 1), at(0, 1)));
        assert!(!is_legal(&board, Side::Red, at(7, 1), at(1, 1)));
        assert!(!is_legal(&board, Side::Red, at(7, 1), at(3, 1)));

        place(&mut board, 2, 1, PieceKind::Soldier, Side::Red);
        assert!(!is_legal(&board, Side::Red, at(7, 1), at(0, 1)));
    }

    #[test]
    fn soldier_gains_sideways_moves_across_river() {
        let mut board = Board::new();
        place(&mut board, 6, 4, PieceKind::Soldier, Side::Red);
        assert_eq!(destinations(&board, Side::Red, at(6, 4)), vec![at(5, 4)]);

        place(&mut board, 4, 4, PieceKind::Soldier, Side::Red);
        assert_eq!(
            destinations(&board, Side::Red, at(4, 4)),
            vec![at(3, 4), at(4, 3), at(4, 5)]
        );

        place(&mut board, 0, 0, PieceKind::Soldier, Side::Red);
        assert_eq!(destinations(&board, Side::Red, at(0, 0)), vec![at(0, 1)]);

        place(&mut board, 3, 8, PieceKind::Soldier, Side::Black);
        assert_eq!(destinations(&board, Side::Black, at(3, 8)), vec![at(4, 8)]);

        place(&mut board, 5, 8, PieceKind::Soldier, Side::Black);
        assert_eq!(destinations(&board, Side::Black, at(5, 8)), vec![at(5, 7), at(6, 8)]);
    }
}
