//! Move generation.
//!
//! Moves are produced in two passes: pseudo-legal generation per piece
//! movement rules, then a legality filter that plays each candidate and
//! rejects those leaving the mover's king attacked.

use chess_common::{Color, Move, Piece, PieceKind, Square};
use smallvec::SmallVec;

use crate::position::{CastlingRights, Position};

/// A list of moves sized for a typical position without spilling.
pub type MoveList = SmallVec<[Move; 64]>;

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// True if any piece of color `by` attacks `target`.
pub fn is_square_attacked(position: &Position, target: Square, by: Color) -> bool {
    // A pawn of `by` attacks `target` from one rank behind it.
    let pawn = Piece::new(by, PieceKind::Pawn);
    for df in [-1, 1] {
        if let Some(from) = target.offset(df, -by.pawn_direction()) {
            if position.piece_at(from) == Some(pawn) {
                return true;
            }
        }
    }

    let knight = Piece::new(by, PieceKind::Knight);
    if KNIGHT_OFFSETS.iter().any(|&(df, dr)| {
        target
            .offset(df, dr)
            .is_some_and(|sq| position.piece_at(sq) == Some(knight))
    }) {
        return true;
    }

    let king = Piece::new(by, PieceKind::King);
    if KING_OFFSETS.iter().any(|&(df, dr)| {
        target
            .offset(df, dr)
            .is_some_and(|sq| position.piece_at(sq) == Some(king))
    }) {
        return true;
    }

    slider_attacks(position, target, by, &ROOK_DIRECTIONS, PieceKind::Rook)
        || slider_attacks(position, target, by, &BISHOP_DIRECTIONS, PieceKind::Bishop)
}

fn slider_attacks(
    position: &Position,
    target: Square,
    by: Color,
    directions: &[(i8, i8)],
    slider: PieceKind,
) -> bool {
    directions.iter().any(|&(df, dr)| {
        let mut current = target;
        while let Some(next) = current.offset(df, dr) {
            if let Some(piece) = position.piece_at(next) {
                return piece.color == by
                    && (piece.kind == slider || piece.kind == PieceKind::Queen);
            }
            current = next;
        }
        false
    })
}

/// True if `color`'s king is attacked. A side without a king is never in check.
pub fn is_king_attacked(position: &Position, color: Color) -> bool {
    position
        .king_square(color)
        .is_some_and(|king| is_square_attacked(position, king, color.opposite()))
}

/// Every move obeying piece movement rules, ignoring own-king safety.
pub fn pseudo_legal_moves(position: &Position) -> MoveList {
    let mut moves = MoveList::new();
    let us = position.side_to_move();

    for (from, piece) in position.pieces().filter(|(_, p)| p.color == us) {
        match piece.kind {
            PieceKind::Pawn => push_pawn_moves(position, from, us, &mut moves),
            PieceKind::Knight => {
                push_leaper_moves(position, from, us, &KNIGHT_OFFSETS, &mut moves)
            }
            PieceKind::Bishop => {
                push_slider_moves(position, from, us, &BISHOP_DIRECTIONS, &mut moves)
            }
            PieceKind::Rook => {
                push_slider_moves(position, from, us, &ROOK_DIRECTIONS, &mut moves)
            }
            PieceKind::Queen => {
                push_slider_moves(position, from, us, &ROOK_DIRECTIONS, &mut moves);
                push_slider_moves(position, from, us, &BISHOP_DIRECTIONS, &mut moves);
            }
            PieceKind::King => {
                push_leaper_moves(position, from, us, &KING_OFFSETS, &mut moves);
                push_castling_moves(position, from, us, &mut moves);
            }
        }
    }

    moves
}

/// Every legal move for the side to move.
pub fn legal_moves(position: &Position) -> MoveList {
    let us = position.side_to_move();
    pseudo_legal_moves(position)
        .into_iter()
        .filter(|&mv| !is_king_attacked(&play_unchecked(position, mv), us))
        .collect()
}

fn push_promotions(from: Square, to: Square, moves: &mut MoveList) {
    for kind in PieceKind::PROMOTIONS {
        moves.push(Move::with_promotion(from, to, kind));
    }
}

fn push_pawn_moves(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    let dir = us.pawn_direction();
    let last_rank = us.opposite().back_rank();
    let start_rank = (us.back_rank() as i8 + dir) as u8;

    let push = |to: Square, moves: &mut MoveList| {
        if to.rank() == last_rank {
            push_promotions(from, to, moves);
        } else {
            moves.push(Move::new(from, to));
        }
    };

    if let Some(one) = from.offset(0, dir) {
        if position.piece_at(one).is_none() {
            push(one, moves);
            if from.rank() == start_rank {
                if let Some(two) = one.offset(0, dir) {
                    if position.piece_at(two).is_none() {
                        moves.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = from.offset(df, dir) else {
            continue;
        };
        match position.piece_at(to) {
            Some(target) if target.color != us => push(to, moves),
            None if position.en_passant() == Some(to) => moves.push(Move::new(from, to)),
            _ => {}
        }
    }
}

fn push_leaper_moves(
    position: &Position,
    from: Square,
    us: Color,
    offsets: &[(i8, i8)],
    moves: &mut MoveList,
) {
    for &(df, dr) in offsets {
        if let Some(to) = from.offset(df, dr) {
            if !matches!(position.piece_at(to), Some(p) if p.color == us) {
                moves.push(Move::new(from, to));
            }
        }
    }
}

fn push_slider_moves(
    position: &Position,
    from: Square,
    us: Color,
    directions: &[(i8, i8)],
    moves: &mut MoveList,
) {
    for &(df, dr) in directions {
        let mut current = from;
        while let Some(to) = current.offset(df, dr) {
            match position.piece_at(to) {
                None => moves.push(Move::new(from, to)),
                Some(piece) => {
                    if piece.color != us {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
            }
            current = to;
        }
    }
}

fn push_castling_moves(position: &Position, from: Square, us: Color, moves: &mut MoveList) {
    let rank = us.back_rank();
    if Square::new(4, rank) != Some(from) {
        return;
    }
    let rights = position.castling_rights();
    if !rights.contains(CastlingRights::kingside(us))
        && !rights.contains(CastlingRights::queenside(us))
    {
        return;
    }
    let them = us.opposite();
    if is_square_attacked(position, from, them) {
        return;
    }

    let rook = Some(Piece::new(us, PieceKind::Rook));
    let empty = |files: &[u8]| {
        files
            .iter()
            .filter_map(|&file| Square::new(file, rank))
            .all(|sq| position.piece_at(sq).is_none())
    };
    let safe = |files: &[u8]| {
        files
            .iter()
            .filter_map(|&file| Square::new(file, rank))
            .all(|sq| !is_square_attacked(position, sq, them))
    };

    if rights.contains(CastlingRights::kingside(us))
        && Square::new(7, rank).and_then(|sq| position.piece_at(sq)) == rook
        && empty(&[5, 6])
        && safe(&[5, 6])
    {
        if let Some(to) = Square::new(6, rank) {
            moves.push(Move::new(from, to));
        }
    }

    if rights.contains(CastlingRights::queenside(us))
        && Square::new(0, rank).and_then(|sq| position.piece_at(sq)) == rook
        && empty(&[1, 2, 3])
        && safe(&[2, 3])
    {
        if let Some(to) = Square::new(2, rank) {
            moves.push(Move::new(from, to));
        }
    }
}

/// True if `mv` is the king's two-square castling step.
pub(crate) fn is_castling(position: &Position, mv: Move) -> bool {
    position
        .piece_at(mv.from)
        .is_some_and(|p| p.kind == PieceKind::King)
        && mv.from.file().abs_diff(mv.to.file()) == 2
}

/// True if `mv` is a pawn capturing onto the en-passant target.
pub(crate) fn is_en_passant(position: &Position, mv: Move) -> bool {
    position
        .piece_at(mv.from)
        .is_some_and(|p| p.kind == PieceKind::Pawn)
        && position.en_passant() == Some(mv.to)
        && mv.from.file() != mv.to.file()
        && position.piece_at(mv.to).is_none()
}

/// True if `mv` removes an enemy piece, en passant included.
pub(crate) fn is_capture(position: &Position, mv: Move) -> bool {
    position.piece_at(mv.to).is_some() || is_en_passant(position, mv)
}

/// Play `mv` without any legality checks and return the resulting position.
///
/// `mv` must come from `pseudo_legal_moves(position)`; anything else yields
/// an unspecified (but memory-safe) position.
pub(crate) fn play_unchecked(position: &Position, mv: Move) -> Position {
    let mut next = *position;
    let Some(piece) = position.piece_at(mv.from) else {
        return next;
    };
    let us = piece.color;
    let capture = is_capture(position, mv);

    if is_en_passant(position, mv) {
        if let Some(victim) = Square::new(mv.to.file(), mv.from.rank()) {
            next.set_piece(victim, None);
        }
    }

    if is_castling(position, mv) {
        let rank = mv.from.rank();
        let (rook_from, rook_to) = if mv.to.file() == 6 { (7, 5) } else { (0, 3) };
        if let (Some(rook_from), Some(rook_to)) =
            (Square::new(rook_from, rank), Square::new(rook_to, rank))
        {
            next.set_piece(rook_to, position.piece_at(rook_from));
            next.set_piece(rook_from, None);
        }
    }

    let placed = match mv.promotion {
        Some(kind) if piece.kind == PieceKind::Pawn => Piece::new(us, kind),
        _ => piece,
    };
    next.set_piece(mv.from, None);
    next.set_piece(mv.to, Some(placed));

    let mut rights = position
        .castling_rights()
        .without(CastlingRights::for_corner(mv.from))
        .without(CastlingRights::for_corner(mv.to));
    if piece.kind == PieceKind::King {
        rights = rights.without(CastlingRights::for_color(us));
    }
    next.castling = rights;

    let double_push =
        piece.kind == PieceKind::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2;
    next.en_passant = if double_push {
        Square::new(mv.from.file(), (mv.from.rank() + mv.to.rank()) / 2)
    } else {
        None
    };

    next.halfmove_clock = if piece.kind == PieceKind::Pawn || capture {
        0
    } else {
        position.halfmove_clock() + 1
    };
    if us == Color::Black {
        next.fullmove_number = position.fullmove_number() + 1;
    }
    next.side_to_move = us.opposite();

    next
}

/// Count leaf nodes of the legal move tree to `depth` plies.
pub fn perft(position: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(position);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|&mv| perft(&play_unchecked(position, mv), depth - 1))
        .sum()
}
