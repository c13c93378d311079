//! Text conversions for board values at notation boundaries.

use crate::types::{Color, PieceKind, Square};

/// Format a square in algebraic form (`e4`).
pub fn format_square(sq: Square) -> String {
    sq.to_string()
}

/// Parse an algebraic square; `None` on anything else.
pub fn parse_square(s: &str) -> Option<Square> {
    s.parse().ok()
}

/// Lowercase color name used in snapshots and status output.
pub fn format_color(color: Color) -> String {
    color.as_str().to_string()
}

/// Lower-case piece letter as used by UCI promotion suffixes.
pub fn format_piece(kind: PieceKind) -> char {
    kind.to_char_lower()
}

/// FEN side-to-move field.
pub fn format_side(color: Color) -> char {
    match color {
        Color::White => 'w',
        Color::Black => 'b',
    }
}

pub fn parse_side(s: &str) -> Option<Color> {
    match s {
        "w" => Some(Color::White),
        "b" => Some(Color::Black),
        _ => None,
    }
}

/// Promotion letter in either case; pawns and kings are not promotion targets.
pub fn parse_promotion(c: char) -> Option<PieceKind> {
    PieceKind::from_char(c).filter(|kind| kind.is_promotion_target())
}
