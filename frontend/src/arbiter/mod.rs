pub mod battle;
pub mod config;
pub mod control;
pub mod instance;
pub mod lobby;
