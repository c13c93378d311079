//! Terminal driver for the chess rules engine.
//!
//! With no subcommand (or `play`) it runs an interactive session reading
//! moves and commands from stdin; see [`commands::HELP`]. `replay` imports a
//! PGN file and prints the resulting game, and `perft` counts move-tree leaf
//! nodes for debugging move generation.
//!
//! Logging goes to stderr, filtered by `RUST_LOG`, unless
//! `CHESS_CLI_LOG_DIR` points at a directory for daily rolling log files
//! (see [`config`] for all tunables).

use std::path::PathBuf;
use std::time::Instant;

use chess::{parse_fen, perft, GameError, GameSession, Position, PromotionPolicy};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

/// Top-level CLI arguments.
#[derive(Parser)]
#[command(name = "chess-cli", about = "Play, replay and inspect chess games")]
struct Cli {
    /// Optional subcommand. When omitted, starts an interactive game.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an interactive game on stdin/stdout.
    Play {
        /// Start from this FEN instead of the standard position.
        #[arg(long)]
        fen: Option<String>,

        /// Promote to a queen when a promotion piece is omitted.
        #[arg(long)]
        auto_queen: bool,
    },
    /// Import a PGN file and print the game.
    Replay {
        file: PathBuf,

        /// Print a JSON snapshot instead of the move list.
        #[arg(long)]
        json: bool,
    },
    /// Count leaf nodes of the legal move tree.
    Perft {
        depth: u32,

        #[arg(long)]
        fen: Option<String>,
    },
}

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("invalid FEN: {0}")]
    Fen(#[from] chess::FenError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the tracing subscriber. The returned guard must be held until exit
/// so buffered file output is flushed.
fn init_logging() -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    match config::get_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir).ok();
            let file_appender = tracing_appender::rolling::daily(&log_dir, config::LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn new_session(fen: Option<&str>, auto_queen: bool) -> Result<GameSession, CliError> {
    let mut session = match fen {
        Some(fen) => GameSession::from_fen(fen)?,
        None => GameSession::new(),
    };
    session.set_policy(if auto_queen {
        PromotionPolicy::AutoQueen
    } else {
        config::get_promotion_policy()
    });
    for (tag, value) in config::get_default_tags() {
        session.set_tag(tag, value);
    }
    Ok(session)
}

fn handle_play(fen: Option<String>, auto_queen: bool) -> Result<(), CliError> {
    let mut session = new_session(fen.as_deref(), auto_queen)?;
    tracing::info!(fen = %session.current_fen(), policy = ?session.policy(), "Starting session");

    println!("chess-cli - type `help` for commands");
    println!("{}", session.current_fen());
    let stdin = std::io::stdin();
    commands::run_repl(&mut session, stdin.lock(), std::io::stdout())?;

    tracing::info!(plies = session.len(), result = %session.result(), "Session ended");
    Ok(())
}

fn handle_replay(file: PathBuf, json: bool) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&file)
        .map_err(|source| CliError::ReadFile { path: file.clone(), source })?;

    let mut session = GameSession::with_policy(config::get_promotion_policy());
    session.load_pgn(&text)?;
    tracing::info!(file = %file.display(), plies = session.len(), "Replayed game");

    if json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        println!("{}", commands::numbered_moves(&session));
        println!("{}", session.current_fen());
        println!("{}", commands::status_line(&session));
    }
    Ok(())
}

fn handle_perft(depth: u32, fen: Option<String>) -> Result<(), CliError> {
    let position = match fen {
        Some(fen) => parse_fen(&fen)?,
        None => Position::starting(),
    };

    for d in 1..=depth {
        let started = Instant::now();
        let nodes = perft(&position, d);
        let elapsed = started.elapsed();
        tracing::debug!(depth = d, nodes, elapsed_ms = elapsed.as_millis() as u64, "perft");
        println!("depth {d}: {nodes} ({:.3}s)", elapsed.as_secs_f64());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let _guard = init_logging();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Play { fen, auto_queen }) => handle_play(fen, auto_queen)?,
        Some(Commands::Replay { file, json }) => handle_replay(file, json)?,
        Some(Commands::Perft { depth, fen }) => handle_perft(depth, fen)?,
        None => handle_play(None, false)?,
    }

    Ok(())
}
