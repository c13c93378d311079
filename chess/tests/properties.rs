//! Random legal-move walks from the starting position.

use chess::movegen::is_king_attacked;
use chess::{format_fen, parse_fen, GameSession, STARTING_FEN};
use proptest::prelude::*;

/// Play up to `picks.len()` moves, each chosen by index into the legal list.
fn walk(picks: &[usize]) -> GameSession {
    let mut session = GameSession::new();
    for &pick in picks {
        let moves = session.legal_moves();
        if moves.is_empty() {
            break;
        }
        session
            .apply_move(moves[pick % moves.len()])
            .expect("listed moves are playable");
    }
    session
}

fn picks() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 0..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn legal_moves_never_leave_own_king_attacked(picks in picks()) {
        let session = walk(&picks);
        let position = *session.position();
        let mover = position.side_to_move();
        for mv in session.legal_moves() {
            let next = position.apply_move(mv).unwrap().position;
            prop_assert!(!is_king_attacked(&next, mover), "{} leaves king attacked", mv);
        }
    }

    #[test]
    fn fen_round_trips_every_reached_position(picks in picks()) {
        let session = walk(&picks);
        for record in session.history() {
            let fen = format_fen(&record.position);
            prop_assert_eq!(parse_fen(&fen).unwrap(), record.position);
        }
    }

    #[test]
    fn undo_restores_previous_fen(picks in picks()) {
        let mut session = walk(&picks);
        let moves = session.legal_moves();
        prop_assume!(!moves.is_empty());

        let before = session.current_fen();
        session.apply_move(moves[0]).unwrap();
        session.undo().unwrap();
        prop_assert_eq!(session.current_fen(), before);
    }

    #[test]
    fn ply_zero_is_always_the_start(picks in picks()) {
        let mut session = walk(&picks);
        let len = session.len();
        session.go_to_ply(0).unwrap();
        prop_assert_eq!(session.current_fen(), STARTING_FEN);
        prop_assert_eq!(session.len(), len);

        session.go_to_ply(len).unwrap();
        if let Some(last) = session.history().last() {
            prop_assert_eq!(session.position(), &last.position);
        }
    }

    #[test]
    fn pgn_export_reimports_same_moves(picks in picks()) {
        let session = walk(&picks);
        let mut imported = GameSession::new();
        imported.load_pgn(&session.current_pgn()).unwrap();
        prop_assert_eq!(imported.move_list(), session.move_list());
        prop_assert_eq!(imported.current_fen(), session.current_fen());
    }
}
