use chess_common::{format_uci_move, parse_promotion, Move, PieceKind, Square};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::movegen::{self, is_capture, is_castling};
use crate::position::Position;

const CASTLE_KINGSIDE: &str = "O-O";
const CASTLE_QUEENSIDE: &str = "O-O-O";

static SAN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^
        ([NBRQK])?          # piece letter, absent for pawns
        ([a-h])?            # origin file
        ([1-8])?            # origin rank
        (x)?                # capture marker
        ([a-h][1-8])        # destination
        (?:=?([NBRQnbrq]))? # promotion piece
        $
        ",
    )
    .expect("SAN pattern is valid")
});

/// Format a legal move as SAN, including the check or mate suffix.
///
/// Only legality matters here: a move in a position already drawn by the
/// fifty-move rule or by insufficient material still gets its notation.
pub fn format_san(position: &Position, mv: Move) -> Result<String, SanError> {
    let legal = movegen::legal_moves(position);
    if !legal.contains(&mv) {
        return Err(SanError::NoLegalMove(format_uci_move(mv)));
    }

    let next = movegen::play_unchecked(position, mv);
    let mut san = san_body(position, mv, &legal);
    if movegen::is_king_attacked(&next, next.side_to_move()) {
        san.push(if movegen::legal_moves(&next).is_empty() { '#' } else { '+' });
    }
    Ok(san)
}

/// SAN without the `+`/`#` suffix. `mv` must be a member of `legal`.
pub(crate) fn san_body(position: &Position, mv: Move, legal: &[Move]) -> String {
    let Some(piece) = position.piece_at(mv.from) else {
        return format_uci_move(mv);
    };

    if is_castling(position, mv) {
        return if mv.to.file() == 6 {
            CASTLE_KINGSIDE.to_string()
        } else {
            CASTLE_QUEENSIDE.to_string()
        };
    }

    let mut san = String::new();
    let capture = is_capture(position, mv);

    if piece.kind == PieceKind::Pawn {
        if capture {
            san.push(mv.from.file_char());
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(promo.to_char_upper());
        }
        return san;
    }

    san.push(piece.kind.to_char_upper());
    san.push_str(&disambiguation(position, mv, piece.kind, legal));
    if capture {
        san.push('x');
    }
    san.push_str(&mv.to.to_string());
    san
}

/// Minimal origin hint: file if it is unique, else rank, else both.
fn disambiguation(position: &Position, mv: Move, kind: PieceKind, legal: &[Move]) -> String {
    let rivals: Vec<Square> = legal
        .iter()
        .filter(|other| other.to == mv.to && other.from != mv.from)
        .filter(|other| position.piece_at(other.from).is_some_and(|p| p.kind == kind))
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        return mv.from.file_char().to_string();
    }
    if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        return mv.from.rank_char().to_string();
    }
    mv.from.to_string()
}

/// Parse Standard Algebraic Notation (SAN) move
///
/// Accepts trailing `+`, `#`, `!` and `?`, zero-castling (`0-0`) and an
/// omitted `=` before the promotion letter. Over-specified origins are fine
/// as long as they still select exactly one legal move.
pub fn parse_san(position: &Position, san: &str) -> Result<Move, SanError> {
    let text = san
        .trim()
        .trim_end_matches(['+', '#', '!', '?']);
    if text.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = movegen::legal_moves(position);

    let castle = match text {
        "O-O" | "0-0" => Some(6),
        "O-O-O" | "0-0-0" => Some(2),
        _ => None,
    };
    if let Some(file) = castle {
        return legal
            .iter()
            .copied()
            .find(|&mv| is_castling(position, mv) && mv.to.file() == file)
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }

    let caps = SAN_PATTERN
        .captures(text)
        .ok_or_else(|| SanError::InvalidFormat(san.to_string()))?;

    let kind = caps
        .get(1)
        .and_then(|m| m.as_str().chars().next())
        .and_then(PieceKind::from_char)
        .unwrap_or(PieceKind::Pawn);
    let from_file = caps
        .get(2)
        .and_then(|m| m.as_str().bytes().next())
        .map(|b| b - b'a');
    let from_rank = caps
        .get(3)
        .and_then(|m| m.as_str().bytes().next())
        .map(|b| b - b'1');
    let to: Square = caps[5]
        .parse()
        .map_err(|_| SanError::InvalidFormat(san.to_string()))?;
    let promotion = match caps.get(6).and_then(|m| m.as_str().chars().next()) {
        Some(c) => Some(
            parse_promotion(c).ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?,
        ),
        None => None,
    };
    if promotion.is_some() && kind != PieceKind::Pawn {
        return Err(SanError::InvalidPromotion(san.to_string()));
    }

    let candidates: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|mv| mv.to == to)
        .filter(|mv| position.piece_at(mv.from).is_some_and(|p| p.kind == kind))
        .filter(|mv| match from_file {
            Some(file) => mv.from.file() == file,
            // A pawn without an origin file can only be pushing straight ahead.
            None => kind != PieceKind::Pawn || mv.from.file() == to.file(),
        })
        .filter(|mv| from_rank.map_or(true, |rank| mv.from.rank() == rank))
        .filter(|mv| !(kind == PieceKind::King && is_castling(position, *mv)))
        .collect();

    if candidates.is_empty() {
        return Err(SanError::NoLegalMove(san.to_string()));
    }
    if candidates.iter().all(|mv| mv.promotion.is_some()) {
        let Some(promotion) = promotion else {
            return Err(SanError::InvalidPromotion(san.to_string()));
        };
        return candidates
            .into_iter()
            .find(|mv| mv.promotion == Some(promotion))
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }
    if promotion.is_some() {
        return Err(SanError::InvalidPromotion(san.to_string()));
    }

    match candidates.as_slice() {
        [mv] => Ok(*mv),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;

    fn mv(uci: &str) -> Move {
        chess_common::parse_uci_move(uci).unwrap()
    }

    fn san_of(fen: &str, uci: &str) -> String {
        format_san(&parse_fen(fen).unwrap(), mv(uci)).unwrap()
    }

    #[test]
    fn test_basic_san() {
        let start = Position::starting();
        assert_eq!(format_san(&start, mv("e2e4")).unwrap(), "e4");
        assert_eq!(format_san(&start, mv("g1f3")).unwrap(), "Nf3");
        assert!(matches!(
            format_san(&start, mv("e2e5")),
            Err(SanError::NoLegalMove(_))
        ));
    }

    #[test]
    fn test_san_on_drawn_positions() {
        // Fifty-move clock already expired.
        assert_eq!(san_of("4k3/8/8/8/8/8/8/R3K3 w - - 100 80", "a1a8"), "Ra8+");
        // King and bishop against king.
        assert_eq!(san_of("4k3/8/8/8/8/8/8/4KB2 w - - 0 1", "f1b5"), "Bb5+");
        assert_eq!(
            format_san(&parse_fen("4k3/8/8/8/8/8/8/4KB2 w - - 0 1").unwrap(), mv("f1f3")),
            Err(SanError::NoLegalMove("f1f3".to_string()))
        );
    }

    #[test]
    fn test_disambiguation_by_file_rank_and_square() {
        // Knights on b1 and f1 both reach d2.
        let fen = "4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1";
        assert_eq!(san_of(fen, "b1d2"), "Nbd2");
        assert_eq!(san_of(fen, "f1d2"), "Nfd2");

        // Rooks on a1 and a5 share a file: rank disambiguates.
        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san_of(fen, "a1a3"), "R1a3");
        assert_eq!(san_of(fen, "a5a3"), "R5a3");

        // Three queens on b2: the corner queen needs file and rank.
        let fen = "4k3/8/8/8/8/Q7/8/Q1Q1K3 w - - 0 1";
        assert_eq!(san_of(fen, "a1b2"), "Qa1b2");
        assert_eq!(san_of(fen, "a3b2"), "Q3b2");
        assert_eq!(san_of(fen, "c1b2"), "Qcb2");
    }

    #[test]
    fn test_pinned_rival_needs_no_disambiguation() {
        // The e2 knight is pinned, so Nd4 needs no origin hint.
        let fen = "4k3/4r3/8/8/8/8/2N1N3/4K3 w - - 0 1";
        assert_eq!(san_of(fen, "c2d4"), "Nd4");
    }

    #[test]
    fn test_captures_and_special_moves() {
        assert_eq!(san_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), "exd5");
        assert_eq!(san_of("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2", "e5d6"), "exd6");
        assert_eq!(san_of("4k3/8/8/3p4/8/8/8/3RK3 w - - 0 1", "d1d5"), "Rxd5");
        assert_eq!(san_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1g1"), "O-O");
        assert_eq!(san_of("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1", "e8c8"), "O-O-O");
        assert_eq!(san_of("1n5k/P7/8/8/8/8/8/K7 w - - 0 1", "a7b8q"), "axb8=Q+");
    }

    #[test]
    fn test_parse_san_basic() {
        let start = Position::starting();
        assert_eq!(parse_san(&start, "e4").unwrap(), mv("e2e4"));
        assert_eq!(parse_san(&start, "Nf3").unwrap(), mv("g1f3"));
        assert_eq!(parse_san(&start, "Nf3!?").unwrap(), mv("g1f3"));
        assert!(matches!(parse_san(&start, "Ne4"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&start, "Zz9"), Err(SanError::InvalidFormat(_))));
        assert!(matches!(parse_san(&start, ""), Err(SanError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_san_disambiguation() {
        let pos = parse_fen("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1").unwrap();
        assert!(matches!(parse_san(&pos, "Nd2"), Err(SanError::AmbiguousMove(_))));
        assert_eq!(parse_san(&pos, "Nbd2").unwrap(), mv("b1d2"));
        assert_eq!(parse_san(&pos, "Nf1d2").unwrap(), mv("f1d2"));
        assert_eq!(parse_san(&pos, "Nc3").unwrap(), mv("b1c3"));
    }

    #[test]
    fn test_parse_san_castling_and_promotion() {
        let pos = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(parse_san(&pos, "O-O").unwrap(), mv("e1g1"));
        assert_eq!(parse_san(&pos, "0-0-0").unwrap(), mv("e1c1"));
        assert_eq!(parse_san(&pos, "Kf1").unwrap(), mv("e1f1"));

        let pos = parse_fen("1n5k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(parse_san(&pos, "a8=Q").unwrap(), mv("a7a8q"));
        assert_eq!(parse_san(&pos, "axb8N").unwrap(), mv("a7b8n"));
        assert_eq!(parse_san(&pos, "axb8=R+").unwrap(), mv("a7b8r"));
        assert!(matches!(parse_san(&pos, "a8"), Err(SanError::InvalidPromotion(_))));
        assert!(matches!(parse_san(&pos, "Ka2=Q"), Err(SanError::InvalidPromotion(_))));
    }

    #[test]
    fn test_san_round_trips_over_legal_moves() {
        let kiwipete = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let pos = parse_fen(kiwipete).unwrap();
        for legal in pos.legal_moves() {
            let text = format_san(&pos, legal).unwrap();
            assert_eq!(parse_san(&pos, &text).unwrap(), legal, "{text}");
        }
    }
}
