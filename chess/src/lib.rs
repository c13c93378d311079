pub mod fen;
pub mod game;
pub mod movegen;
pub mod pgn;
pub mod position;
pub mod rules;

pub use chess_common::{
    format_uci_move, parse_uci_move, Color, Move, Piece, PieceKind, Square, UciError,
};
pub use fen::{format_fen, parse_fen, FenError, STARTING_FEN};
pub use game::{
    GameError, GameSession, ImportError, MoveRecord, PromotionPolicy, SessionSnapshot,
};
pub use movegen::{legal_moves, perft, MoveList};
pub use pgn::{format_san, parse_pgn, parse_san, write_pgn, PgnError, PgnGame, SanError};
pub use position::{CastlingRights, Position};
pub use rules::{apply_move, AppliedMove, DrawReason, GameResult, GameStatus, MoveError};
