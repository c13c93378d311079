//! Game rules on top of move generation: applying moves, check, mate and
//! the draw conditions.

use chess_common::{Color, Move, PieceKind, Square};

use crate::movegen::{self, MoveList};
use crate::pgn::san;
use crate::position::Position;

/// Outcome of a successful `apply_move`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub position: Position,
    pub san: String,
    pub is_check: bool,
    pub is_checkmate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Illegal move: {0}")]
    IllegalMove(Move),
    #[error("Promotion piece required for {0}")]
    PromotionRequired(Move),
    #[error("Game is over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl DrawReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stalemate => "stalemate",
            Self::InsufficientMaterial => "insufficient_material",
            Self::FiftyMoveRule => "fifty_move_rule",
            Self::ThreefoldRepetition => "threefold_repetition",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Draw(DrawReason),
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    pub fn result(self) -> GameResult {
        match self {
            Self::Ongoing => GameResult::Ongoing,
            Self::Checkmate {
                winner: Color::White,
            } => GameResult::WhiteWins,
            Self::Checkmate {
                winner: Color::Black,
            } => GameResult::BlackWins,
            Self::Draw(_) => GameResult::Draw,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Checkmate { .. } => "checkmate",
            Self::Draw(reason) => reason.as_str(),
        }
    }
}

/// Final score of a game as written in PGN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate `mv` against `position` and return the new position with its SAN.
///
/// The promotion piece must be given exactly when a pawn reaches the last
/// rank; the engine never picks one on the caller's behalf.
pub fn apply_move(position: &Position, mv: Move) -> Result<AppliedMove, MoveError> {
    let legal = movegen::legal_moves(position);
    if legal.is_empty() || is_draw_by_material_or_clock(position) {
        return Err(MoveError::GameOver);
    }
    let mv = resolve_move(&legal, mv)?;

    let next = movegen::play_unchecked(position, mv);
    let is_check = movegen::is_king_attacked(&next, next.side_to_move());
    let is_checkmate = is_check && movegen::legal_moves(&next).is_empty();

    let mut text = san::san_body(position, mv, &legal);
    if is_checkmate {
        text.push('#');
    } else if is_check {
        text.push('+');
    }

    Ok(AppliedMove {
        position: next,
        san: text,
        is_check,
        is_checkmate,
    })
}

/// Check `mv` against the legal set without applying it.
pub fn validate_move(position: &Position, mv: Move) -> Result<Move, MoveError> {
    resolve_move(&movegen::legal_moves(position), mv)
}

fn resolve_move(legal: &[Move], mv: Move) -> Result<Move, MoveError> {
    let mut candidates = legal
        .iter()
        .filter(|m| m.from == mv.from && m.to == mv.to)
        .peekable();
    let Some(first) = candidates.peek().copied() else {
        return Err(MoveError::IllegalMove(mv));
    };

    if first.promotion.is_none() {
        return match mv.promotion {
            None => Ok(*first),
            Some(_) => Err(MoveError::IllegalMove(mv)),
        };
    }

    match mv.promotion {
        None => Err(MoveError::PromotionRequired(mv)),
        Some(kind) => candidates
            .find(|m| m.promotion == Some(kind))
            .copied()
            .ok_or(MoveError::IllegalMove(mv)),
    }
}

/// True if `from -> to` is a legal pawn move onto the last rank.
pub fn is_promotion(position: &Position, from: Square, to: Square) -> bool {
    movegen::legal_moves(position)
        .iter()
        .any(|m| m.from == from && m.to == to && m.promotion.is_some())
}

pub fn is_check(position: &Position) -> bool {
    movegen::is_king_attacked(position, position.side_to_move())
}

pub fn is_checkmate(position: &Position) -> bool {
    is_check(position) && movegen::legal_moves(position).is_empty()
}

pub fn is_stalemate(position: &Position) -> bool {
    !is_check(position) && movegen::legal_moves(position).is_empty()
}

/// Neither side can ever deliver mate: bare kings, a single minor piece,
/// or any number of bishops all standing on one square color.
pub fn is_insufficient_material(position: &Position) -> bool {
    let mut bishop_colors = [false; 2];
    let mut minors = 0;
    for (sq, piece) in position.pieces() {
        match piece.kind {
            PieceKind::King => {}
            PieceKind::Knight => minors += 1,
            PieceKind::Bishop => {
                minors += 1;
                bishop_colors[usize::from(sq.is_dark())] = true;
            }
            PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen => return false,
        }
    }

    let single_minor = minors <= 1;
    let bishops_one_color = !(bishop_colors[0] && bishop_colors[1])
        && position
            .pieces()
            .all(|(_, p)| matches!(p.kind, PieceKind::King | PieceKind::Bishop));
    single_minor || bishops_one_color
}

pub fn is_fifty_move_draw(position: &Position) -> bool {
    position.halfmove_clock() >= 100
}

/// `history` holds every position reached in the game, current one included.
pub fn is_threefold_repetition(position: &Position, history: &[Position]) -> bool {
    let key = position.repetition_key();
    history.iter().filter(|p| p.repetition_key() == key).count() >= 3
}

fn is_draw_by_material_or_clock(position: &Position) -> bool {
    is_insufficient_material(position) || is_fifty_move_draw(position)
}

pub fn is_draw(position: &Position, history: &[Position]) -> bool {
    matches!(status(position, history), GameStatus::Draw(_))
}

/// Classify `position`; mate takes precedence over every draw rule.
pub fn status(position: &Position, history: &[Position]) -> GameStatus {
    if movegen::legal_moves(position).is_empty() {
        return if is_check(position) {
            GameStatus::Checkmate {
                winner: position.side_to_move().opposite(),
            }
        } else {
            GameStatus::Draw(DrawReason::Stalemate)
        };
    }
    if is_insufficient_material(position) {
        return GameStatus::Draw(DrawReason::InsufficientMaterial);
    }
    if is_fifty_move_draw(position) {
        return GameStatus::Draw(DrawReason::FiftyMoveRule);
    }
    if is_threefold_repetition(position, history) {
        return GameStatus::Draw(DrawReason::ThreefoldRepetition);
    }
    GameStatus::Ongoing
}

impl Position {
    pub fn legal_moves(&self) -> MoveList {
        movegen::legal_moves(self)
    }

    pub fn apply_move(&self, mv: Move) -> Result<AppliedMove, MoveError> {
        apply_move(self, mv)
    }

    pub fn is_check(&self) -> bool {
        is_check(self)
    }

    pub fn is_checkmate(&self) -> bool {
        is_checkmate(self)
    }

    pub fn is_stalemate(&self) -> bool {
        is_stalemate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{format_fen, parse_fen};

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn mv(uci: &str) -> Move {
        chess_common::parse_uci_move(uci).unwrap()
    }

    fn play(position: Position, moves: &[&str]) -> Position {
        moves.iter().fold(position, |pos, m| {
            apply_move(&pos, mv(m)).unwrap().position
        })
    }

    #[test]
    fn test_e2e4_from_start() {
        let applied = apply_move(&Position::starting(), mv("e2e4")).unwrap();
        assert_eq!(
            format_fen(&applied.position),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        assert_eq!(applied.san, "e4");
        assert!(!applied.is_check);
    }

    #[test]
    fn test_illegal_move_rejected() {
        let start = Position::starting();
        assert_eq!(
            apply_move(&start, mv("e2e5")),
            Err(MoveError::IllegalMove(mv("e2e5")))
        );
        // Black piece on white's turn.
        assert!(matches!(
            apply_move(&start, mv("e7e5")),
            Err(MoveError::IllegalMove(_))
        ));
        // Promotion letter on an ordinary move.
        assert_eq!(
            apply_move(&start, mv("e2e4q")),
            Err(MoveError::IllegalMove(mv("e2e4q")))
        );
    }

    #[test]
    fn test_promotion_policy_is_strict() {
        let pos = parse_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let bare = Move::new(sq("a7"), sq("a8"));
        assert_eq!(apply_move(&pos, bare), Err(MoveError::PromotionRequired(bare)));

        let applied = apply_move(&pos, mv("a7a8n")).unwrap();
        assert_eq!(applied.san, "a8=N");
        assert!(is_promotion(&pos, sq("a7"), sq("a8")));
        assert!(!is_promotion(&pos, Square::A1, Square::B1));
    }

    #[test]
    fn test_promotion_with_check() {
        let pos = parse_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let applied = apply_move(&pos, mv("a7a8q")).unwrap();
        assert_eq!(applied.san, "a8=Q+");
        assert!(applied.is_check);
        assert!(!applied.is_checkmate);
    }

    #[test]
    fn test_scholars_mate() {
        let pos = play(
            Position::starting(),
            &["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6"],
        );
        let applied = apply_move(&pos, mv("h5f7")).unwrap();
        assert_eq!(applied.san, "Qxf7#");
        assert!(applied.is_checkmate);
        assert!(is_checkmate(&applied.position));
        assert_eq!(
            status(&applied.position, &[]),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
        assert_eq!(status(&applied.position, &[]).result(), GameResult::WhiteWins);
    }

    #[test]
    fn test_moves_rejected_after_checkmate() {
        let pos = play(Position::starting(), &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert!(is_checkmate(&pos));
        assert_eq!(apply_move(&pos, mv("a2a3")), Err(MoveError::GameOver));
        assert_eq!(status(&pos, &[]).result(), GameResult::BlackWins);
    }

    #[test]
    fn test_stalemate() {
        let pos = parse_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(is_stalemate(&pos));
        assert!(!is_checkmate(&pos));
        assert!(is_draw(&pos, &[]));
        assert_eq!(status(&pos, &[]), GameStatus::Draw(DrawReason::Stalemate));
        assert_eq!(apply_move(&pos, mv("h8h7")), Err(MoveError::GameOver));
    }

    #[test]
    fn test_insufficient_material() {
        let drawn = [
            "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/4KN2 w - - 0 1",
            "4kb2/8/8/8/8/8/8/4K3 w - - 0 1",
            // Bishops on the same square color.
            "4k3/8/8/8/8/8/1B6/2B1K3 w - - 0 1",
            "2b1k3/8/8/8/8/8/8/4KB2 w - - 0 1",
        ];
        for fen in drawn {
            let pos = parse_fen(fen).unwrap();
            assert!(is_insufficient_material(&pos), "{fen}");
            assert_eq!(
                status(&pos, &[]),
                GameStatus::Draw(DrawReason::InsufficientMaterial)
            );
        }

        let playable = [
            "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/3NKN2 w - - 0 1",
            "4kb2/8/8/8/8/8/8/4KB2 w - - 0 1",
            "4kn2/8/8/8/8/8/8/4KB2 w - - 0 1",
            "4k3/8/8/8/8/8/8/R3K3 w - - 0 1",
        ];
        for fen in playable {
            assert!(!is_insufficient_material(&parse_fen(fen).unwrap()), "{fen}");
        }
    }

    #[test]
    fn test_fifty_move_rule() {
        let pos = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 100 80").unwrap();
        assert!(is_fifty_move_draw(&pos));
        assert_eq!(status(&pos, &[]), GameStatus::Draw(DrawReason::FiftyMoveRule));
        assert_eq!(apply_move(&pos, mv("a1a2")), Err(MoveError::GameOver));

        let pos = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 99 80").unwrap();
        let applied = apply_move(&pos, mv("a1a2")).unwrap();
        assert_eq!(applied.position.halfmove_clock(), 100);
        assert!(is_draw(&applied.position, &[]));
    }

    #[test]
    fn test_mate_beats_fifty_move_rule() {
        let pos = parse_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 99 80").unwrap();
        let applied = apply_move(&pos, mv("a1a8")).unwrap();
        assert!(applied.is_checkmate);
        assert_eq!(applied.position.halfmove_clock(), 100);
        assert_eq!(
            status(&applied.position, &[]),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
    }

    #[test]
    fn test_threefold_repetition() {
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let mut history = vec![Position::starting()];
        let mut pos = Position::starting();
        for m in shuffle.iter().chain(shuffle.iter()) {
            pos = apply_move(&pos, mv(m)).unwrap().position;
            history.push(pos);
        }
        assert_eq!(pos.repetition_key(), Position::starting().repetition_key());
        assert!(is_threefold_repetition(&pos, &history));
        assert_eq!(
            status(&pos, &history),
            GameStatus::Draw(DrawReason::ThreefoldRepetition)
        );
        assert!(!is_threefold_repetition(&pos, &history[..5]));
    }

    #[test]
    fn test_clocks_and_counters() {
        let pos = play(Position::starting(), &["g1f3", "g8f6", "b1c3"]);
        assert_eq!(pos.halfmove_clock(), 3);
        assert_eq!(pos.fullmove_number(), 2);
        let pos = play(pos, &["e7e5"]);
        assert_eq!(pos.halfmove_clock(), 0);
        assert_eq!(pos.fullmove_number(), 3);
        assert_eq!(pos.en_passant(), Some(sq("e6")));
        let pos = play(pos, &["f3e5"]);
        assert_eq!(pos.halfmove_clock(), 0);
        assert_eq!(pos.en_passant(), None);
    }

    #[test]
    fn test_position_methods_delegate() {
        let pos = Position::starting();
        assert_eq!(pos.legal_moves().len(), 20);
        assert!(!pos.is_check());
        assert!(pos.apply_move(mv("g1f3")).is_ok());
        assert_eq!(validate_move(&pos, mv("b1c3")), Ok(mv("b1c3")));
    }
}
