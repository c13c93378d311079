//! Line-oriented REPL over a `GameSession`.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use chess::{format_san, parse_uci_move, Color, GameError, GameSession, Square};

pub const HELP: &str = "\
Commands:
  <move>          play a move in UCI (e2e4, e7e8q) or SAN (e4, Nf3, O-O)
  move <move>     same as above
  undo            take back the last move
  goto <ply>      jump to a ply (0 = start position)
  fen             print the current FEN
  pgn             print the game as PGN
  moves           print the move list
  legal [square]  list legal moves, optionally from one square
  status          side to move, check and result
  json            print a JSON snapshot of the session
  load <file>     import a PGN file
  reset           start over from the initial position
  help            show this help
  quit            exit";

/// A parsed REPL command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(String),
    Undo,
    Goto(usize),
    Fen,
    Pgn,
    Moves,
    Legal(Option<Square>),
    Status,
    Json,
    Load(PathBuf),
    Reset,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let arg = (!rest.is_empty()).then_some(rest);

        let command = match word {
            "" => return Err(CommandError::Empty),
            "move" => Self::Move(arg.ok_or(CommandError::MissingArgument("move"))?.to_string()),
            "undo" => Self::Undo,
            "goto" => {
                let text = arg.ok_or(CommandError::MissingArgument("goto"))?;
                Self::Goto(
                    text.parse()
                        .map_err(|_| CommandError::InvalidPly(text.to_string()))?,
                )
            }
            "fen" => Self::Fen,
            "pgn" => Self::Pgn,
            "moves" => Self::Moves,
            "legal" => Self::Legal(
                arg.map(|text| {
                    text.parse::<Square>()
                        .map_err(|_| CommandError::InvalidSquare(text.to_string()))
                })
                .transpose()?,
            ),
            "status" => Self::Status,
            "json" => Self::Json,
            "load" => Self::Load(PathBuf::from(
                arg.ok_or(CommandError::MissingArgument("load"))?,
            )),
            "reset" | "new" => Self::Reset,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ if arg.is_none() => Self::Move(word.to_string()),
            _ => return Err(CommandError::Unknown(line.to_string())),
        };
        Ok(command)
    }
}

/// What the REPL should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Print(String),
    Quit,
}

/// Run one command against `session`
pub fn execute(session: &mut GameSession, command: Command) -> Result<Outcome, CommandError> {
    let text = match command {
        Command::Move(text) => play(session, &text)?,
        Command::Undo => {
            session.undo()?;
            session.current_fen()
        }
        Command::Goto(ply) => {
            session.go_to_ply(ply)?;
            session.current_fen()
        }
        Command::Fen => session.current_fen(),
        Command::Pgn => session.current_pgn().trim_end().to_string(),
        Command::Moves => numbered_moves(session),
        Command::Legal(square) => {
            let moves = match square {
                Some(square) => session.legal_moves_from(square),
                None => session.legal_moves(),
            };
            let mut sans: Vec<String> = moves
                .iter()
                .filter_map(|mv| format_san(session.position(), *mv).ok())
                .collect();
            sans.sort();
            if sans.is_empty() {
                "No legal moves".to_string()
            } else {
                sans.join(" ")
            }
        }
        Command::Status => status_line(session),
        Command::Json => serde_json::to_string_pretty(&session.snapshot())?,
        Command::Load(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|source| CommandError::Read { path, source })?;
            session.load_pgn(&text)?;
            format!("Loaded {} moves\n{}", session.len(), status_line(session))
        }
        Command::Reset => {
            session.reset();
            session.current_fen()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Outcome::Quit),
    };
    Ok(Outcome::Print(text))
}

/// Play `text` as UCI if it parses as such, otherwise as SAN.
fn play(session: &mut GameSession, text: &str) -> Result<String, CommandError> {
    let prefix = move_number(session.position().fullmove_number(), session.side_to_move());
    let san = match parse_uci_move(text) {
        Ok(mv) => session.apply_move(mv)?.san.clone(),
        Err(_) => session.apply_san(text)?.san.clone(),
    };

    let mut out = format!("{prefix} {san}");
    if session.is_game_over() {
        out.push('\n');
        out.push_str(&status_line(session));
    }
    Ok(out)
}

fn move_number(fullmove: u32, side: Color) -> String {
    match side {
        Color::White => format!("{fullmove}."),
        Color::Black => format!("{fullmove}..."),
    }
}

/// One line per full move, marking the cursor with `*`.
pub fn numbered_moves(session: &GameSession) -> String {
    let start = session.start_position();
    let mut lines: Vec<String> = Vec::new();
    let mut number = start.fullmove_number();
    let mut side = start.side_to_move();

    for (index, record) in session.history().iter().enumerate() {
        let marker = if index + 1 == session.ply() { "*" } else { "" };
        let san = format!("{}{marker}", record.san);
        if side == Color::Black && index > 0 {
            if let Some(line) = lines.last_mut() {
                line.push(' ');
                line.push_str(&san);
            }
        } else {
            lines.push(format!("{} {san}", move_number(number, side)));
        }
        if side == Color::Black {
            number += 1;
        }
        side = side.opposite();
    }

    if lines.is_empty() {
        "No moves".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn status_line(session: &GameSession) -> String {
    let status = session.status();
    let mut line = format!(
        "{} to move, ply {}/{}",
        session.side_to_move(),
        session.ply(),
        session.len()
    );
    if session.is_check() && !status.is_over() {
        line.push_str(", check");
    }
    if status.is_over() {
        line.push_str(&format!(", {} ({})", status.as_str(), status.result()));
    } else if session.result() != chess::GameResult::Ongoing {
        line.push_str(&format!(", result {}", session.result()));
    }
    line
}

/// Read commands from `input` until EOF or `quit`
pub fn run_repl<R: BufRead, W: Write>(
    session: &mut GameSession,
    input: R,
    mut output: W,
) -> std::io::Result<()> {
    write!(output, "> ")?;
    output.flush()?;
    for line in input.lines() {
        let line = line?;
        match line.parse::<Command>().and_then(|cmd| execute(session, cmd)) {
            Ok(Outcome::Print(text)) => writeln!(output, "{text}")?,
            Ok(Outcome::Quit) => return Ok(()),
            Err(CommandError::Empty) => {}
            Err(e) => {
                tracing::debug!(input = %line, "Command failed: {}", e);
                writeln!(output, "Error: {e}")?;
            }
        }
        write!(output, "> ")?;
        output.flush()?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid ply: {0}")]
    InvalidPly(String),
    #[error("invalid square: {0}")]
    InvalidSquare(String),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{MoveError, STARTING_FEN};
    use std::io::Cursor;

    fn run(session: &mut GameSession, line: &str) -> Result<Outcome, CommandError> {
        execute(session, line.parse()?)
    }

    fn printed(session: &mut GameSession, line: &str) -> String {
        match run(session, line).unwrap() {
            Outcome::Print(text) => text,
            Outcome::Quit => panic!("unexpected quit for {line}"),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("e2e4".parse::<Command>().unwrap(), Command::Move("e2e4".into()));
        assert_eq!("move Nf3".parse::<Command>().unwrap(), Command::Move("Nf3".into()));
        assert_eq!(" undo ".parse::<Command>().unwrap(), Command::Undo);
        assert_eq!("goto 3".parse::<Command>().unwrap(), Command::Goto(3));
        assert_eq!("legal".parse::<Command>().unwrap(), Command::Legal(None));
        assert_eq!(
            "legal g1".parse::<Command>().unwrap(),
            Command::Legal(Some(Square::G1))
        );
        assert_eq!(
            "load my games/a.pgn".parse::<Command>().unwrap(),
            Command::Load(PathBuf::from("my games/a.pgn"))
        );
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);

        assert!(matches!("".parse::<Command>(), Err(CommandError::Empty)));
        assert!(matches!("goto".parse::<Command>(), Err(CommandError::MissingArgument("goto"))));
        assert!(matches!("goto -1".parse::<Command>(), Err(CommandError::InvalidPly(_))));
        assert!(matches!("legal z9".parse::<Command>(), Err(CommandError::InvalidSquare(_))));
        assert!(matches!("frobnicate now".parse::<Command>(), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_play_uci_and_san() {
        let mut session = GameSession::new();
        assert_eq!(printed(&mut session, "e2e4"), "1. e4");
        assert_eq!(printed(&mut session, "e5"), "1... e5");
        assert_eq!(printed(&mut session, "move Nf3"), "2. Nf3");
        assert_eq!(printed(&mut session, "moves"), "1. e4 e5\n2. Nf3*");
    }

    #[test]
    fn test_illegal_move_reports_error() {
        let mut session = GameSession::new();
        let err = run(&mut session, "e2e5").unwrap_err();
        assert!(matches!(
            err,
            CommandError::Game(GameError::Move(MoveError::IllegalMove(_)))
        ));
        assert!(session.is_empty());
    }

    #[test]
    fn test_navigation() {
        let mut session = GameSession::new();
        for mv in ["e4", "e5", "Nf3"] {
            run(&mut session, mv).unwrap();
        }
        assert_eq!(printed(&mut session, "goto 0"), STARTING_FEN);
        assert_eq!(printed(&mut session, "moves"), "1. e4 e5\n2. Nf3");
        printed(&mut session, "goto 3");
        printed(&mut session, "undo");
        assert_eq!(session.move_list(), ["e4", "e5"]);
        assert!(matches!(
            run(&mut session, "goto 9"),
            Err(CommandError::Game(GameError::OutOfRange { ply: 9, len: 2 }))
        ));
    }

    #[test]
    fn test_checkmate_prints_status() {
        let mut session = GameSession::new();
        for mv in ["f3", "e5", "g4"] {
            run(&mut session, mv).unwrap();
        }
        let text = printed(&mut session, "Qh4#");
        assert_eq!(text, "2... Qh4#\nwhite to move, ply 4/4, checkmate (0-1)");
        assert_eq!(printed(&mut session, "legal"), "No legal moves");
    }

    #[test]
    fn test_legal_from_square() {
        let mut session = GameSession::new();
        assert_eq!(printed(&mut session, "legal g1"), "Nf3 Nh3");
    }

    #[test]
    fn test_load_pgn_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("game.pgn");
        std::fs::write(&path, "[White \"Alice\"]\n\n1. d4 d5 2. c4 *\n").unwrap();

        let mut session = GameSession::new();
        let text = printed(&mut session, &format!("load {}", path.display()));
        assert!(text.starts_with("Loaded 3 moves"));
        assert_eq!(session.tag("White"), Some("Alice"));

        let missing = dir.path().join("missing.pgn");
        assert!(matches!(
            run(&mut session, &format!("load {}", missing.display())),
            Err(CommandError::Read { .. })
        ));
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_json_snapshot() {
        let mut session = GameSession::new();
        run(&mut session, "e4").unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&printed(&mut session, "json")).unwrap();
        assert_eq!(json["moves"][0], "e4");
        assert_eq!(json["side_to_move"], "black");
    }

    #[test]
    fn test_run_repl() {
        let mut session = GameSession::new();
        let input = Cursor::new("e4\n\nbogus move\nfen\nquit\ne5\n");
        let mut output = Vec::new();
        run_repl(&mut session, input, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("1. e4\n"));
        assert!(output.contains("Error: unknown command"));
        assert!(output.contains("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1\n"));
        // Nothing after quit is executed.
        assert_eq!(session.len(), 1);
    }
}
