//! Portable Game Notation and Standard Algebraic Notation

pub mod parser;
pub mod san;
pub mod writer;

pub use parser::{parse_pgn, PgnError, PgnGame, PgnMove};
pub use san::{format_san, parse_san, SanError};
pub use writer::{write_pgn, SEVEN_TAG_ROSTER};
