//! UCI (Universal Chess Interface) move text utilities

use crate::converters::{format_piece, format_square, parse_promotion, parse_square};
use crate::types::Move;

/// Parse a move in UCI long algebraic form (`e2e4`, `e7e8q`, `e1g1`).
///
/// Only the syntax is checked here; legality is the rules engine's job.
pub fn parse_uci_move(text: &str) -> Result<Move, UciError> {
    let text = text.trim();
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(UciError::InvalidFormat(text.to_string()));
    }

    let from = parse_square(&text[0..2])
        .ok_or_else(|| UciError::InvalidSquare(text[0..2].to_string()))?;
    let to = parse_square(&text[2..4])
        .ok_or_else(|| UciError::InvalidSquare(text[2..4].to_string()))?;
    let promotion = match text[4..].chars().next() {
        Some(c) => Some(parse_promotion(c).ok_or(UciError::InvalidPromotion(c))?),
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Invalid UCI move: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(char),
}
