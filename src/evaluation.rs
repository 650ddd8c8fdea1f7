use crate::board::Board;
use crate::piece::{PieceKind, Side};

pub fn weight(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::General => 1000,
        PieceKind::Advisor => 20,
        PieceKind::Elephant => 20,
        PieceKind::Horse => 40,
        PieceKind::Chariot => 90,
        PieceKind::Cannon => 45,
        PieceKind::Soldier => 10,
    }
}

/// Material balance in hundreds of points; positive favors red.
pub fn evaluate(board: &Board) -> f64 {
    let total: i32 = board
        .iter()
        .map(|(_, piece)| match piece.side {
            Side::Red => weight(piece.kind),
            Side::Black => -weight(piece.kind),
        })
        .sum();
    f64::from(total) / 100.0
}
