//! Coordinate move strings (`a0a1`) and the ideographic notation used for display.
//!
//! Coordinate strings are the only accepted input. The ideographic form names the
//! piece, its file, a direction and a distance or target file; it is produced for
//! transcripts and observers and is never parsed back.

use crate::location::Position;
use crate::piece::{Piece, PieceKind, Side};

const RED_NUMERALS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];
const BLACK_NUMERALS: [char; 9] = ['１', '２', '３', '４', '５', '６', '７', '８', '９'];

const ADVANCE: char = '进';
const RETREAT: char = '退';
const TRAVERSE: char = '平';

/// Splits a four character coordinate string into origin and destination.
pub fn decode(text: &str) -> Option<(Position, Position)> {
    if text.len() != 4 || !text.is_ascii() {
        return None;
    }

    let mut chars = text.chars();
    let from = Position::from_chars(&mut chars)?;
    let to = Position::from_chars(&mut chars)?;
    Some((from, to))
}

pub fn encode(position: Position) -> String {
    position.to_string()
}

fn numeral(side: Side, value: i8) -> char {
    let numerals = match side {
        Side::Red => &RED_NUMERALS,
        Side::Black => &BLACK_NUMERALS,
    };
    numerals[(value - 1) as usize]
}

/// Files are counted from each side's own right hand.
fn file(side: Side, position: Position) -> i8 {
    match side {
        Side::Red => 9 - position.col(),
        Side::Black => position.col() + 1,
    }
}

pub fn display_notation(from: Position, to: Position, piece: Piece) -> String {
    let side = piece.side;
    let origin = numeral(side, file(side, from));

    let rows = (to.row() - from.row()) * side.forward();
    if rows == 0 {
        let target = numeral(side, file(side, to));
        return format!("{}{origin}{TRAVERSE}{target}", piece.chinese_char());
    }

    let action = if rows > 0 { ADVANCE } else { RETREAT };
    let amount = match piece.kind {
        PieceKind::Advisor | PieceKind::Elephant | PieceKind::Horse => numeral(side, file(side, to)),
        _ => numeral(side, rows.abs()),
    };

    format!("{}{origin}{action}{amount}", piece.chinese_char())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: i8, col: i8) -> Position {
        Position::new(row, col).unwrap()
    }

    #[test]
    fn decode_maps_column_then_row() {
        assert_eq!(decode("a0a1"), Some((at(0, 0), at(1, 0))));
        assert_eq!(decode("i9e5"), Some((at(9, 8), at(5, 4))));
    }

    #[test]
    fn decode_rejects_malformed() {
        for text in ["", "a0a", "a0a10", "j0a1", "a0aa", "A0a1", "a-a1", "炮二平五", "a0 a1"] {
            assert_eq!(decode(text), None, "{text:?}");
        }
    }

    #[test]
    fn encode_is_inverse() {
        assert_eq!(encode(at(9, 8)), "i9");
        assert_eq!(encode(at(0, 0)), "a0");
    }

    #[test]
    fn red_notation() {
        let cannon = Piece::new(PieceKind::Cannon, Side::Red);
        assert_eq!(display_notation(at(7, 7), at(7, 4), cannon), "炮二平五");
        assert_eq!(display_notation(at(7, 7), at(3, 7), cannon), "炮二进四");

        let horse = Piece::new(PieceKind::Horse, Side::Red);
        assert_eq!(display_notation(at(9, 7), at(7, 6), horse), "傌二进三");

        let chariot = Piece::new(PieceKind::Chariot, Side::Red);
        assert_eq!(display_notation(at(5, 0), at(8, 0), chariot), "俥九退三");
    }

    #[test]
    fn black_notation() {
        let horse = Piece::new(PieceKind::Horse, Side::Black);
        assert_eq!(display_notation(at(0, 1), at(2, 2), horse), "馬２进３");

        let soldier = Piece::new(PieceKind::Soldier, Side::Black);
        assert_eq!(display_notation(at(3, 4), at(4, 4), soldier), "卒５进１");

        let advisor = Piece::new(PieceKind::Advisor, Side::Black);
        assert_eq!(display_notation(at(1, 4), at(0, 3), advisor), "士５退４");
    }
}
