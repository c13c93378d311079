//! Forsyth–Edwards Notation

use chess_common::{format_side, parse_side, Color, Piece, PieceKind, Square};

use crate::movegen::is_king_attacked;
use crate::position::{CastlingRights, Position};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const CASTLING_FLAGS: [(char, CastlingRights); 4] = [
    ('K', CastlingRights::WHITE_KINGSIDE),
    ('Q', CastlingRights::WHITE_QUEENSIDE),
    ('k', CastlingRights::BLACK_KINGSIDE),
    ('q', CastlingRights::BLACK_QUEENSIDE),
];

/// Parse a FEN string into a Position
pub fn parse_fen(fen: &str) -> Result<Position, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    let [placement, side, castling, en_passant, halfmove, fullmove] = parts[..] else {
        return Err(FenError::InvalidFormat);
    };

    let mut position = Position::empty();
    parse_placement(placement, &mut position)?;

    position.side_to_move =
        parse_side(side).ok_or_else(|| FenError::InvalidSideToMove(side.to_string()))?;
    position.castling = parse_castling(castling)?;
    position.en_passant = parse_en_passant(en_passant, &position)?;
    position.halfmove_clock = halfmove
        .parse()
        .map_err(|_| FenError::InvalidHalfmoveClock(halfmove.to_string()))?;
    position.fullmove_number = fullmove
        .parse()
        .ok()
        .filter(|&n: &u32| n >= 1)
        .ok_or_else(|| FenError::InvalidFullmoveNumber(fullmove.to_string()))?;

    validate(&position)?;
    Ok(position)
}

fn parse_placement(placement: &str, position: &mut Position) -> Result<(), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::InvalidBoardLayout);
    }

    for (rank_idx, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - rank_idx as u8;
        let mut file = 0u8;
        let mut previous_was_digit = false;
        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                if !(1..=8).contains(&skip) || previous_was_digit {
                    return Err(FenError::InvalidBoardLayout);
                }
                file += skip as u8;
                previous_was_digit = true;
            } else {
                let piece = Piece::from_fen_char(c).ok_or(FenError::InvalidPiece(c))?;
                let sq = Square::new(file, rank).ok_or(FenError::InvalidBoardLayout)?;
                position.set_piece(sq, Some(piece));
                file += 1;
                previous_was_digit = false;
            }
            if file > 8 {
                return Err(FenError::InvalidBoardLayout);
            }
        }
        if file != 8 {
            return Err(FenError::InvalidBoardLayout);
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> Result<CastlingRights, FenError> {
    if field == "-" {
        return Ok(CastlingRights::NONE);
    }
    let mut rights = CastlingRights::NONE;
    for c in field.chars() {
        let flag = CASTLING_FLAGS
            .iter()
            .find(|(letter, _)| *letter == c)
            .map(|(_, flag)| *flag)
            .ok_or_else(|| FenError::InvalidCastling(field.to_string()))?;
        if rights.contains(flag) {
            return Err(FenError::InvalidCastling(field.to_string()));
        }
        rights |= flag;
    }
    Ok(rights)
}

fn parse_en_passant(field: &str, position: &Position) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }
    let invalid = || FenError::InvalidEnPassant(field.to_string());
    let target: Square = field.parse().map_err(|_| invalid())?;

    // The target sits behind a pawn of the side that just moved.
    let mover = position.side_to_move().opposite();
    let expected_rank = (mover.back_rank() as i8 + 2 * mover.pawn_direction()) as u8;
    if target.rank() != expected_rank {
        return Err(invalid());
    }
    let pawn_square = target.offset(0, mover.pawn_direction()).ok_or_else(invalid)?;
    let origin = target.offset(0, -mover.pawn_direction()).ok_or_else(invalid)?;
    if position.piece_at(pawn_square) != Some(Piece::new(mover, PieceKind::Pawn))
        || position.piece_at(target).is_some()
        || position.piece_at(origin).is_some()
    {
        return Err(invalid());
    }
    Ok(Some(target))
}

fn validate(position: &Position) -> Result<(), FenError> {
    for color in Color::ALL {
        let kings = position
            .pieces()
            .filter(|(_, p)| *p == Piece::new(color, PieceKind::King))
            .count();
        if kings != 1 {
            return Err(FenError::InvalidKingCount(color));
        }
    }

    if position
        .pieces()
        .any(|(sq, p)| p.kind == PieceKind::Pawn && (sq.rank() == 0 || sq.rank() == 7))
    {
        return Err(FenError::PawnOnBackRank);
    }

    if is_king_attacked(position, position.side_to_move().opposite()) {
        return Err(FenError::OpponentInCheck);
    }
    Ok(())
}

/// Format a Position as a FEN string
pub fn format_fen(position: &Position) -> String {
    let mut fen = String::with_capacity(90);

    for rank in (0..8u8).rev() {
        let mut empty = 0;
        for file in 0..8u8 {
            match Square::new(file, rank).and_then(|sq| position.piece_at(sq)) {
                Some(piece) => {
                    if empty > 0 {
                        fen.push_str(&empty.to_string());
                        empty = 0;
                    }
                    fen.push(piece.to_fen_char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            fen.push_str(&empty.to_string());
        }
        if rank > 0 {
            fen.push('/');
        }
    }

    fen.push(' ');
    fen.push(format_side(position.side_to_move()));

    fen.push(' ');
    let rights = position.castling_rights();
    if rights.is_empty() {
        fen.push('-');
    } else {
        for (letter, flag) in CASTLING_FLAGS {
            if rights.contains(flag) {
                fen.push(letter);
            }
        }
    }

    fen.push(' ');
    match position.en_passant() {
        Some(sq) => fen.push_str(&sq.to_string()),
        None => fen.push('-'),
    }

    fen.push_str(&format!(
        " {} {}",
        position.halfmove_clock(),
        position.fullmove_number()
    ));
    fen
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
    #[error("Invalid piece character: {0}")]
    InvalidPiece(char),
    #[error("Invalid side to move: {0}")]
    InvalidSideToMove(String),
    #[error("Invalid castling field: {0}")]
    InvalidCastling(String),
    #[error("Invalid en passant square: {0}")]
    InvalidEnPassant(String),
    #[error("Invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),
    #[error("Invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),
    #[error("Expected exactly one {0} king")]
    InvalidKingCount(Color),
    #[error("Pawn on first or last rank")]
    PawnOnBackRank,
    #[error("Side not to move is in check")]
    OpponentInCheck,
}
