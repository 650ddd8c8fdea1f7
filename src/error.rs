use crate::location::Move;
use std::fmt::{Display, Formatter};

/// Why a move or undo was refused. None of these leave the game modified.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MoveError {
    /// Not a four character coordinate string within the board.
    Parse(String),
    /// Well formed, but the piece rules or occupancy forbid it.
    Illegal(Move),
    /// A general has already been captured.
    GameOver,
    /// Nothing to undo.
    NoHistory,
}

impl MoveError {
    /// Short token used on the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Parse(_) => "malformed",
            Self::Illegal(_) => "illegal",
            Self::GameOver => "over",
            Self::NoHistory => "empty",
        }
    }
}

impl Display for MoveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(text) => write!(f, "malformed move {text:?}"),
            Self::Illegal(mv) => write!(f, "illegal move {mv}"),
            Self::GameOver => write!(f, "game is already over"),
            Self::NoHistory => write!(f, "no move to undo"),
        }
    }
}

impl std::error::Error for MoveError {}
