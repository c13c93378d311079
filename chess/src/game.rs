use chess_common::{format_color, Color, Move, PieceKind, Square};
use serde::Serialize;

use crate::fen::{format_fen, parse_fen, FenError};
use crate::movegen::MoveList;
use crate::pgn::{parse_pgn, parse_san, write_pgn, PgnError, SanError};
use crate::position::Position;
use crate::rules::{self, DrawReason, GameResult, GameStatus, MoveError};

/// How `apply_move` treats a pawn move onto the last rank with no piece given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromotionPolicy {
    /// Reject with `MoveError::PromotionRequired`.
    #[default]
    Require,
    /// Promote to a queen.
    AutoQueen,
}

/// A move as played in the session, with the position it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub mv: Move,
    pub position: Position,
    pub san: String,
    pub is_check: bool,
    pub is_checkmate: bool,
}

/// Linear game history with a navigation cursor
///
/// `ply` counts the records applied to reach the live position, so `0` is
/// the start position and `len()` is the end of the recorded game.
#[derive(Debug, Clone)]
pub struct GameSession {
    start: Position,
    records: Vec<MoveRecord>,
    ply: usize,
    position: Position,
    tags: Vec<(String, String)>,
    policy: PromotionPolicy,
}

impl GameSession {
    /// Create a session at the standard starting position
    pub fn new() -> Self {
        Self::with_start(Position::starting(), PromotionPolicy::default())
    }

    pub fn with_policy(policy: PromotionPolicy) -> Self {
        Self::with_start(Position::starting(), policy)
    }

    /// Create a session starting from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        Ok(Self::with_start(parse_fen(fen)?, PromotionPolicy::default()))
    }

    fn with_start(start: Position, policy: PromotionPolicy) -> Self {
        Self {
            start,
            records: Vec::new(),
            ply: 0,
            position: start,
            tags: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: PromotionPolicy) {
        self.policy = policy;
    }

    /// Play a move at the cursor, discarding any recorded moves after it
    pub fn apply_move(&mut self, mv: Move) -> Result<&MoveRecord, GameError> {
        let mv = self.with_promotion_policy(mv);
        if self.is_repetition_draw() {
            return Err(MoveError::GameOver.into());
        }
        let applied = rules::apply_move(&self.position, mv)?;

        if self.ply < self.records.len() {
            tracing::debug!(
                ply = self.ply,
                discarded = self.records.len() - self.ply,
                "Truncating recorded moves"
            );
            self.records.truncate(self.ply);
        }
        self.clear_result_tag();

        self.records.push(MoveRecord {
            mv,
            position: applied.position,
            san: applied.san,
            is_check: applied.is_check,
            is_checkmate: applied.is_checkmate,
        });
        self.ply = self.records.len();
        self.position = applied.position;

        let record = &self.records[self.ply - 1];
        tracing::debug!(ply = self.ply, mv = %record.mv, san = %record.san, "Applied move");
        Ok(record)
    }

    /// Parse `text` as SAN at the live position and play it
    pub fn apply_san(&mut self, text: &str) -> Result<&MoveRecord, GameError> {
        let mv = parse_san(&self.position, text)?;
        self.apply_move(mv)
    }

    /// Step back one ply, dropping the move that produced the live position
    /// together with anything recorded after it
    ///
    /// At the end of the game this removes the last record. With the cursor
    /// mid-history every record past the cursor is discarded as well, so the
    /// session never keeps moves that no longer follow from the live position.
    pub fn undo(&mut self) -> Result<(), GameError> {
        if self.ply == 0 {
            return Err(GameError::NoMoves);
        }
        self.records.truncate(self.ply - 1);
        self.ply -= 1;
        self.position = self.position_at(self.ply);
        self.clear_result_tag();
        tracing::debug!(ply = self.ply, "Undid move");
        Ok(())
    }

    /// Move the cursor to `ply` by replaying the recorded moves from the start
    pub fn go_to_ply(&mut self, ply: usize) -> Result<(), GameError> {
        let len = self.records.len();
        if ply > len {
            return Err(GameError::OutOfRange { ply, len });
        }

        let mut position = self.start;
        for (index, record) in self.records[..ply].iter().enumerate() {
            let applied = rules::apply_move(&position, record.mv)
                .map_err(|_| GameError::ReplayDiverged { ply: index + 1 })?;
            if applied.san != record.san {
                return Err(GameError::ReplayDiverged { ply: index + 1 });
            }
            position = applied.position;
        }

        self.position = position;
        self.ply = ply;
        tracing::debug!(ply, len, "Navigated");
        Ok(())
    }

    /// Replace the session with the first game in `text`
    ///
    /// Every move is replayed through the rules engine. On any failure the
    /// session is left untouched.
    #[tracing::instrument(skip_all, fields(bytes = text.len()))]
    pub fn load_pgn(&mut self, text: &str) -> Result<(), GameError> {
        match self.import(text) {
            Ok(imported) => {
                tracing::debug!(plies = imported.len(), "Imported PGN");
                *self = imported;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected PGN import: {}", e);
                Err(GameError::Import(e))
            }
        }
    }

    fn import(&self, text: &str) -> Result<Self, ImportError> {
        let game = parse_pgn(text)?;
        let start = match game.tag("FEN") {
            Some(fen) => parse_fen(fen)?,
            None => Position::starting(),
        };

        let mut session = Self::with_start(start, self.policy);
        session.tags = game.tags.clone();
        for (index, token) in game.moves.iter().enumerate() {
            let ply = index + 1;
            let mv = parse_san(&session.position, &token.san).map_err(|source| {
                ImportError::San {
                    ply,
                    san: token.san.clone(),
                    source,
                }
            })?;
            session.apply_move(mv).map_err(|e| ImportError::Move {
                ply,
                san: token.san.clone(),
                source: match e {
                    GameError::Move(source) => source,
                    _ => MoveError::IllegalMove(mv),
                },
            })?;
        }

        // apply_move drops the Result tag; restore the imported one.
        let result = game
            .tag("Result")
            .and_then(GameResult::from_token)
            .or(game.result);
        if let Some(result) = result {
            session.set_tag("Result", result.as_str());
        }
        Ok(session)
    }

    /// Discard all moves and return to the start position
    pub fn reset(&mut self) {
        self.records.clear();
        self.ply = 0;
        self.position = self.start;
        self.clear_result_tag();
        tracing::debug!("Reset session");
    }

    pub fn current_fen(&self) -> String {
        format_fen(&self.position)
    }

    /// The recorded game as PGN, independent of the cursor
    pub fn current_pgn(&self) -> String {
        write_pgn(&self.tags, &self.start, &self.move_list(), self.result())
    }

    /// Result of the recorded game
    ///
    /// A terminal final position decides it; otherwise an imported `Result`
    /// tag is used, falling back to `Ongoing`.
    pub fn result(&self) -> GameResult {
        let history = self.positions_until(self.records.len());
        let last = history.last().copied().unwrap_or(self.start);
        match rules::status(&last, &history) {
            GameStatus::Ongoing => self
                .tag("Result")
                .and_then(GameResult::from_token)
                .unwrap_or(GameResult::Ongoing),
            status => status.result(),
        }
    }

    /// Status of the live position, repetition included
    pub fn status(&self) -> GameStatus {
        rules::status(&self.position, &self.positions_until(self.ply))
    }

    pub fn is_game_over(&self) -> bool {
        self.status().is_over()
    }

    pub fn is_check(&self) -> bool {
        rules::is_check(&self.position)
    }

    pub fn is_checkmate(&self) -> bool {
        rules::is_checkmate(&self.position)
    }

    pub fn is_draw(&self) -> bool {
        matches!(self.status(), GameStatus::Draw(_))
    }

    /// SAN of every recorded move in ply order
    pub fn move_list(&self) -> Vec<String> {
        self.records.iter().map(|r| r.san.clone()).collect()
    }

    /// Would `apply_move(mv)` succeed right now?
    pub fn is_legal(&self, mv: Move) -> bool {
        let mv = self.with_promotion_policy(mv);
        !self.is_game_over() && rules::validate_move(&self.position, mv).is_ok()
    }

    /// Playable moves at the live position; empty once the game is over
    pub fn legal_moves(&self) -> MoveList {
        if self.is_game_over() {
            return MoveList::new();
        }
        self.position.legal_moves()
    }

    pub fn legal_moves_from(&self, square: Square) -> MoveList {
        self.legal_moves()
            .into_iter()
            .filter(|m| m.from == square)
            .collect()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn start_position(&self) -> &Position {
        &self.start
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.records
    }

    /// Index of the record that produced the live position; `None` at the start
    pub fn cursor(&self) -> Option<usize> {
        self.ply.checked_sub(1)
    }

    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Set a PGN tag, replacing any existing value
    pub fn set_tag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.tags.push((name, value)),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let status = self.status();
        SessionSnapshot {
            fen: self.current_fen(),
            pgn: self.current_pgn(),
            moves: self.move_list(),
            cursor: self.cursor(),
            ply: self.ply,
            side_to_move: format_color(self.side_to_move()),
            game_over: status.is_over(),
            result: self.result().as_str().to_string(),
            status: status.as_str().to_string(),
        }
    }

    fn with_promotion_policy(&self, mv: Move) -> Move {
        if self.policy == PromotionPolicy::AutoQueen
            && mv.promotion.is_none()
            && rules::is_promotion(&self.position, mv.from, mv.to)
        {
            return Move::with_promotion(mv.from, mv.to, PieceKind::Queen);
        }
        mv
    }

    fn is_repetition_draw(&self) -> bool {
        self.status() == GameStatus::Draw(DrawReason::ThreefoldRepetition)
    }

    fn clear_result_tag(&mut self) {
        self.tags.retain(|(key, _)| key != "Result");
    }

    fn position_at(&self, ply: usize) -> Position {
        match ply {
            0 => self.start,
            n => self.records[n - 1].position,
        }
    }

    /// Every position from the start through `ply`, inclusive
    fn positions_until(&self, ply: usize) -> Vec<Position> {
        std::iter::once(self.start)
            .chain(self.records[..ply].iter().map(|r| r.position))
            .collect()
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of a session for front ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub fen: String,
    pub pgn: String,
    pub moves: Vec<String>,
    pub cursor: Option<usize>,
    pub ply: usize,
    pub side_to_move: String,
    pub game_over: bool,
    pub result: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("No moves to undo")]
    NoMoves,
    #[error("Ply {ply} out of range 0..={len}")]
    OutOfRange { ply: usize, len: usize },
    #[error("Replay diverged from recorded moves at ply {ply}")]
    ReplayDiverged { ply: usize },
    #[error("FEN parse error: {0}")]
    FenError(#[from] FenError),
    #[error("SAN parse error: {0}")]
    San(#[from] SanError),
    #[error("PGN import failed: {0}")]
    Import(#[from] ImportError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Pgn(#[from] PgnError),
    #[error("FEN tag: {0}")]
    Fen(#[from] FenError),
    #[error("ply {ply} ({san}): {source}")]
    San {
        ply: usize,
        san: String,
        source: SanError,
    },
    #[error("ply {ply} ({san}): {source}")]
    Move {
        ply: usize,
        san: String,
        source: MoveError,
    },
}
