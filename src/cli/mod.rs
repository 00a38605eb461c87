//! Command implementations and terminal rendering

pub mod process;
pub mod setup;
pub mod ui;
