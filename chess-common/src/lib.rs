//! Common value types and notation helpers for the chess workspace.
//!
//! This crate holds the leaf types shared by the rules engine and the CLI:
//! squares, pieces, colors and moves, plus the small converters and UCI
//! helpers used wherever those values cross a text boundary.

pub mod converters;
pub mod types;
pub mod uci;

// Re-export commonly used items
pub use converters::*;
pub use types::{Color, Move, Piece, PieceKind, Square, SquareParseError};
pub use uci::*;
