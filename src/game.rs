use crate::board::Board;
use crate::display_format::DisplayFormat;
use crate::error::MoveError;
use crate::evaluation;
use crate::location::{Move, Position};
use crate::notation;
use crate::piece::{Piece, PieceKind, Side};
use crate::rules;
use log::{debug, trace};
use std::fmt::{Display, Formatter, Write};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
    InProgress,
    Over,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GameResult {
    RedWins,
    BlackWins,
    Draw,
    InProgress,
}

impl GameResult {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RedWins => "red",
            Self::BlackWins => "black",
            Self::Draw => "draw",
            Self::InProgress => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "red" => Some(Self::RedWins),
            "black" => Some(Self::BlackWins),
            "draw" => Some(Self::Draw),
            "none" => Some(Self::InProgress),
            _ => None,
        }
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display + use<> {
        let general = |side| Piece::new(PieceKind::General, side);
        let format = format.with_concise(false);
        match self {
            Self::RedWins => format!("{} won by capturing the black general", general(Side::Red).display(format)),
            Self::BlackWins => format!("{} won by capturing the red general", general(Side::Black).display(format)),
            Self::Draw => "draw with no general left".to_owned(),
            Self::InProgress => "in progress".to_owned(),
        }
    }
}

impl Display for GameResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(DisplayFormat::string()))
    }
}

/// One applied move. Never modified after it enters the history.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MoveRecord {
    pub from: Position,
    pub to: Position,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub side: Side,
    pub index: usize,
    pub notation: String,
}

impl MoveRecord {
    pub fn mv(&self) -> Move {
        Move::new(self.from, self.to)
    }
}

/// The only way to change a board during play. Rejected moves and undos leave it untouched.
#[derive(Clone, Debug)]
pub struct Game {
    board: Board,
    active: Side,
    status: Status,
    history: Vec<MoveRecord>,
}

impl Game {
    pub fn new(board: Board, active: Side) -> Self {
        let status = Self::status_of(&board);
        Self {
            board,
            active,
            status,
            history: Vec::new(),
        }
    }

    pub fn opening() -> Self {
        Self::new(Board::opening(), Side::Red)
    }

    pub fn from_serialized(board: &str, active: Side) -> Option<Self> {
        Some(Self::new(Board::from_serialized(board)?, active))
    }

    fn status_of(board: &Board) -> Status {
        let red = board.find_general(Side::Red);
        let black = board.find_general(Side::Black);
        if red.is_some() && black.is_some() {
            Status::InProgress
        } else {
            Status::Over
        }
    }

    pub fn reset(&mut self) {
        *self = Self::opening();
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn serialize(&self) -> String {
        self.board.serialize()
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.history.last()
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    pub fn apply(&mut self, text: &str) -> bool {
        self.try_apply(text).is_ok()
    }

    pub fn try_apply(&mut self, text: &str) -> Result<&MoveRecord, MoveError> {
        let mv = text.parse::<Move>().inspect_err(|err| trace!("rejected: {err}"))?;
        self.play(mv)
    }

    pub fn play(&mut self, mv: Move) -> Result<&MoveRecord, MoveError> {
        if self.status == Status::Over {
            trace!("rejected {mv}: game is over");
            return Err(MoveError::GameOver);
        }

        let Move { from, to } = mv;
        let piece = match self.board[from] {
            Some(piece) if rules::is_legal(&self.board, self.active, from, to) => piece,
            _ => {
                trace!("rejected illegal {} move {mv}", self.active);
                return Err(MoveError::Illegal(mv));
            }
        };

        let captured = self.board[to].take();
        self.board[to] = self.board[from].take();

        let index = self.history.len();
        let record = MoveRecord {
            from,
            to,
            piece,
            captured,
            side: self.active,
            index,
            notation: notation::display_notation(from, to, piece),
        };
        debug!("({}) {} played {mv} {}", index + 1, self.active, record.notation);

        self.history.push(record);
        self.active = self.active.opponent();
        self.status = Self::status_of(&self.board);

        if self.status == Status::Over {
            debug!("game over after {} moves: {}", self.history.len(), self.result());
        }

        Ok(&self.history[index])
    }

    pub fn undo(&mut self) -> bool {
        self.try_undo().is_ok()
    }

    pub fn try_undo(&mut self) -> Result<MoveRecord, MoveError> {
        let record = self.history.pop().ok_or(MoveError::NoHistory)?;

        self.board[record.from] = Some(record.piece);
        self.board[record.to] = record.captured;
        self.active = record.side;
        self.status = Status::InProgress;

        trace!("undid {} {}", record.mv(), record.notation);
        Ok(record)
    }

    /// Legal moves in row-major order of origin, then destination. Empty once the game is over.
    pub fn legal_move_list(&self) -> Vec<Move> {
        if self.status == Status::Over {
            return Vec::new();
        }

        let origins = self.board.iter().filter(|(_, piece)| piece.side == self.active);
        origins
            .flat_map(|(from, _)| {
                Position::all()
                    .filter(move |&to| rules::is_legal(&self.board, self.active, from, to))
                    .map(move |to| Move::new(from, to))
            })
            .collect()
    }

    pub fn legal_moves(&self) -> Vec<String> {
        self.legal_move_list().iter().map(Move::to_string).collect()
    }

    pub fn is_game_over(&self) -> bool {
        self.status == Status::Over
    }

    pub fn result(&self) -> GameResult {
        let red = self.board.find_general(Side::Red).is_some();
        let black = self.board.find_general(Side::Black).is_some();
        match (red, black) {
            (true, true) => GameResult::InProgress,
            (true, false) => GameResult::RedWins,
            (false, true) => GameResult::BlackWins,
            (false, false) => GameResult::Draw,
        }
    }

    pub fn evaluate(&self) -> f64 {
        evaluation::evaluate(&self.board)
    }

    /// Numbered move list in display notation, one line per red and black pair.
    pub fn transcript(&self) -> String {
        let mut result = String::new();
        let mut number = 0;

        for record in &self.history {
            if record.side == Side::Red || number == 0 {
                number += 1;
                if number > 1 {
                    result.push('\n');
                }
                let _ = write!(result, "{number}.");
                if record.side == Side::Black {
                    result.push_str(" ...");
                }
            }
            result.push(' ');
            result.push_str(&record.notation);
        }

        result
    }

    pub fn display(&self, format: DisplayFormat) -> impl Display + '_ {
        struct Impl<'a>(&'a Game, DisplayFormat);
        return Impl(self, format);

        impl Impl<'_> {
            fn format_row(&self, f: &mut Formatter<'_>, row: i8) -> std::fmt::Result {
                let &Self(game, format) = self;
                let last = game.last_move();
                write!(f, "{row}")?;

                for col in 0..Board::WIDTH {
                    let Some(position) = Position::new(row, col) else {
                        continue;
                    };

                    match game.board[position] {
                        Some(piece) => {
                            let piece = piece.display(format.with_concise(true));
                            if format.effects && last.is_some_and(|record| record.to == position) {
                                write!(f, " \x1B[3m{piece}\x1B[0m")?;
                            } else {
                                write!(f, " {piece}")?;
                            }
                        }
                        None if last.is_some_and(|record| record.from == position) => write!(f, " ╶╴")?,
                        None => write!(f, "   ")?,
                    }
                }

                Ok(())
            }

            /// One line per side listing what it has taken and the material that adds up to.
            fn format_taken(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(game, format) = self;

                for side in [Side::Red, Side::Black] {
                    let mut taken: Vec<Piece> = game
                        .history
                        .iter()
                        .filter(|record| record.side == side)
                        .filter_map(|record| record.captured)
                        .collect();
                    if taken.is_empty() {
                        continue;
                    }

                    taken.sort_by_key(|piece| std::cmp::Reverse(evaluation::weight(piece.kind)));
                    let worth: i32 = taken.iter().map(|piece| evaluation::weight(piece.kind)).sum();

                    write!(f, "taken by {side}:")?;
                    for piece in taken {
                        write!(f, " {}", piece.display(format.with_concise(true)))?;
                    }
                    writeln!(f, " ({:+.2})", f64::from(worth) / 100.0)?;
                }

                Ok(())
            }
        }

        impl Display for Impl<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let &Self(game, format) = self;
                write!(f, "{}", game.board.serialize())?;

                if format.concise {
                    return write!(f, " {}", game.active);
                }

                writeln!(f)?;

                for row in 0..Board::HEIGHT {
                    self.format_row(f, row)?;
                    writeln!(f)?;
                }

                for char in 'a'..='i' {
                    write!(f, "  {char}")?;
                }
                writeln!(f)?;
                self.format_taken(f)?;

                if let Some(record) = game.last_move() {
                    let piece = record.piece.display(format.with_concise(true));
                    write!(f, "({}) {} {piece} {} - ", game.history.len(), record.mv(), record.notation)?;
                }

                if game.is_game_over() {
                    write!(f, "{}", game.result().display(format))?;
                } else {
                    let general = Piece::new(PieceKind::General, game.active).display(format);
                    write!(f, "{general} to play - {} legal moves", game.legal_move_list().len())?;
                }

                writeln!(f)
            }
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::opening()
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(DisplayFormat::string()))
    }
}
