pub mod board;
pub mod display_format;
pub mod error;
pub mod evaluation;
pub mod game;
pub mod location;
pub mod notation;
pub mod piece;
pub mod rules;
