use crate::display_format::DisplayFormat;
use crate::location::Position;
use crate::piece::{Piece, PieceKind, Side};
use std::fmt::{Display, Formatter};
use std::ops::{Index, IndexMut};

/// Piece placement on the 10x9 grid. Holds no rule knowledge.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Board {
    pieces: Vec<Option<Piece>>,
}

impl Board {
    pub const WIDTH: i8 = 9;
    pub const HEIGHT: i8 = 10;
    pub const CELLS: usize = (Self::WIDTH as usize) * (Self::HEIGHT as usize);

    const OPENING: &'static str =
        "rnbakabnr/........./.c.....c./p.p.p.p.p/........./........./P.P.P.P.P/.C.....C./........./RNBAKABNR";

    pub fn new() -> Self {
        Self { pieces: vec![None; Self::CELLS] }
    }

    pub fn opening() -> Self {
        Self::from_serialized(Self::OPENING).expect("opening layout is well formed")
    }

    /// Parses the output of [`Board::serialize`]. Digits are also accepted as runs of empty cells.
    pub fn from_serialized(text: &str) -> Option<Self> {
        let mut board = Self::new();
        let mut rows = 0;

        for (row, line) in text.split('/').enumerate() {
            if row >= Self::HEIGHT as usize {
                return None;
            }

            let mut col = 0;
            for current in line.chars() {
                match current {
                    '.' => col += 1,
                    '1'..='9' => col += (current as u8 - b'0') as i8,
                    _ => {
                        let piece = Piece::from_char(current)?;
                        board[Position::new(row as i8, col)?] = Some(piece);
                        col += 1;
                    }
                }
                if col > Self::WIDTH {
                    return None;
                }
            }

            if col != Self::WIDTH {
                return None;
            }
            rows += 1;
        }

        (rows == Self::HEIGHT as usize).then_some(board)
    }

    pub fn serialize(&self) -> String {
        let rows = self.pieces.chunks(Self::WIDTH as usize).map(|row| {
            row.iter()
                .map(|piece| piece.map_or('.', |piece| piece.to_char()))
                .collect::<String>()
        });
        rows.collect::<Vec<_>>().join("/")
    }

    pub fn get(&self, position: Position) -> Option<Piece> {
        self[position]
    }

    pub fn set(&mut self, position: Position, piece: Option<Piece>) {
        self[position] = piece;
    }

    /// Occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(|position| self[position].map(|piece| (position, piece)))
    }

    pub fn find_general(&self, side: Side) -> Option<Position> {
        let general = Piece::new(PieceKind::General, side);
        self.iter().find(|&(_, piece)| piece == general).map(|(position, _)| position)
    }

    pub fn render(&self) -> String {
        self.display(DisplayFormat::string()).to_string()
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display + '_ {
        struct Impl<'a>(&'a Board, DisplayFormat);
        return Impl(self, format);

        impl Impl<'_> {
            fn format_columns(f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, " ")?;
                for char in 'a'..='i' {
                    write!(f, " {char} ")?;
                }
                writeln!(f)
            }
        }

        impl Display for Impl<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(board, format) = self;
                let format = format.with_concise(true);

                Self::format_columns(f)?;
                for row in 0..Board::HEIGHT {
                    write!(f, "{row}")?;
                    for col in 0..Board::WIDTH {
                        match Position::new(row, col).and_then(|position| board[position]) {
                            Some(piece) => write!(f, " {}", piece.display(format))?,
                            None if format.chinese => write!(f, " · ")?,
                            None => write!(f, " ..")?,
                        }
                    }
                    writeln!(f, " {row}")?;
                }
                Self::format_columns(f)
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Position> for Board {
    type Output = Option<Piece>;
    fn index(&self, index: Position) -> &Self::Output {
        &self.pieces[index.index()]
    }
}

impl IndexMut<Position> for Board {
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        &mut self.pieces[index.index()]
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: i8, col: i8) -> Position {
        Position::new(row, col).unwrap()
    }

    #[test]
    fn opening_layout() {
        let board = Board::opening();
        assert_eq!(
            board.serialize(),
            "rnbakabnr/........./.c.....c./p.p.p.p.p/........./........./P.P.P.P.P/.C.....C./........./RNBAKABNR"
        );
        assert_eq!(board.get(at(9, 4)), Some(Piece::new(PieceKind::General, Side::Red)));
        assert_eq!(board.get(at(2, 1)), Some(Piece::new(PieceKind::Cannon, Side::Black)));
        assert_eq!(board.get(at(4, 4)), None);
        assert_eq!(board.iter().count(), 32);
        assert_eq!(board.find_general(Side::Black), Some(at(0, 4)));
    }

    #[test]
    fn serialized_form_round_trips() {
        let mut board = Board::opening();
        board.set(at(0, 0), None);
        board.set(at(4, 4), Some(Piece::new(PieceKind::Horse, Side::Red)));

        let text = board.serialize();
        assert_eq!(Board::from_serialized(&text), Some(board));
    }

    #[test]
    fn digits_compress_empty_runs() {
        let board = Board::from_serialized("4k4/9/9/9/9/9/9/9/9/4K4").unwrap();
        assert_eq!(board.serialize(), "....k..../........./........./........./........./........./........./........./........./....K....");
    }

    #[test]
    fn malformed_serialization() {
        assert!(Board::from_serialized("").is_none());
        assert!(Board::from_serialized("rnbakabnr").is_none());
        assert!(Board::from_serialized("4k5/9/9/9/9/9/9/9/9/4K4").is_none());
        assert!(Board::from_serialized("4k3/9/9/9/9/9/9/9/9/4K4").is_none());
        assert!(Board::from_serialized("4x4/9/9/9/9/9/9/9/9/4K4").is_none());
        assert!(Board::from_serialized("4k4/9/9/9/9/9/9/9/9/4K4/9").is_none());
    }

    #[test]
    fn render_has_labels() {
        let text = Board::opening().display(DisplayFormat::plain()).to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 12);
        assert!(lines[0].contains('a') && lines[0].contains('i'));
        assert!(lines[1].starts_with('0') && lines[1].ends_with('0'));
        assert!(lines[10].starts_with('9') && lines[10].contains("RR"));
    }
}
