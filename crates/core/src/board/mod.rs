//! Board module - the live, filterable collections view for one period.

mod application_board;
mod board_model;

pub use application_board::ApplicationBoard;
pub use board_model::{ApplicationRow, BoardSnapshot};
