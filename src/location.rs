use crate::board::Board;
use crate::error::MoveError;
use crate::notation;
use std::fmt::Formatter;
use std::str::{Chars, FromStr};

/// A cell on the board. Row 0 is black's back rank, row 9 is red's.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Position {
    row: i8,
    col: i8,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

impl Position {
    pub fn new(row: i8, col: i8) -> Option<Self> {
        if !(0..Board::HEIGHT).contains(&row) || !(0..Board::WIDTH).contains(&col) {
            return None;
        }
        Some(Self { row, col })
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Board::CELLS {
            return None;
        }
        let row = (index / Board::WIDTH as usize) as i8;
        let col = (index % Board::WIDTH as usize) as i8;
        Self::new(row, col)
    }

    /// Reads one column letter `a`..`i` followed by one row digit `0`..`9`.
    pub fn from_chars(chars: &mut Chars<'_>) -> Option<Self> {
        let col = chars.next()?;
        let row = chars.next()?;
        if !('a'..='i').contains(&col) || !row.is_ascii_digit() {
            return None;
        }
        Self::new((row as u8 - b'0') as i8, (col as u8 - b'a') as i8)
    }

    pub fn shift(&self, rows: i8, cols: i8) -> Option<Self> {
        Self::new(self.row + rows, self.col + cols)
    }

    pub fn index(&self) -> usize {
        (self.row * Board::WIDTH + self.col) as usize
    }

    pub fn row(&self) -> i8 {
        self.row
    }

    pub fn col(&self) -> i8 {
        self.col
    }

    /// Every cell in row-major order.
    pub fn all() -> impl Iterator<Item = Self> + Clone {
        (0..Board::CELLS).filter_map(Self::from_index)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.col as u8) as char, self.row)
    }
}

impl Move {
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

impl FromStr for Move {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        notation::decode(s)
            .map(|(from, to)| Self { from, to })
            .ok_or_else(|| MoveError::Parse(s.to_owned()))
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert!(Position::new(9, 8).is_some());
        assert!(Position::new(10, 0).is_none());
        assert!(Position::new(0, 9).is_none());
        assert!(Position::new(-1, 0).is_none());
        assert!(Position::new(0, 0).unwrap().shift(-1, 0).is_none());
        assert!(Position::from_index(Board::CELLS).is_none());
    }

    #[test]
    fn row_major_order() {
        let all: Vec<_> = Position::all().collect();
        assert_eq!(all.len(), 90);
        assert_eq!(all[0], Position::new(0, 0).unwrap());
        assert_eq!(all[1], Position::new(0, 1).unwrap());
        assert_eq!(all[9], Position::new(1, 0).unwrap());
        assert!(all.iter().enumerate().all(|(i, pos)| pos.index() == i));
    }

    #[test]
    fn move_text() {
        let mv: Move = "h7e7".parse().unwrap();
        assert_eq!(mv.from, Position::new(7, 7).unwrap());
        assert_eq!(mv.to, Position::new(7, 4).unwrap());
        assert_eq!(mv.to_string(), "h7e7");
        assert!(matches!("H7E7".parse::<Move>(), Err(MoveError::Parse(_))));
    }
}
