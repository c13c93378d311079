//! Configuration for the chess CLI.
//!
//! Every tunable has a compile-time default and can be overridden at runtime
//! via an environment variable. Command-line flags take precedence over both.

use std::path::PathBuf;

use chess::PromotionPolicy;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// File name prefix for the daily rolling log.
pub const LOG_FILE_PREFIX: &str = "chess-cli";

/// Environment variables that seed PGN tags for new games, by tag name.
const TAG_ENV_VARS: [(&str, &str); 3] = [
    ("Event", "CHESS_CLI_EVENT"),
    ("White", "CHESS_CLI_WHITE"),
    ("Black", "CHESS_CLI_BLACK"),
];

/// Get the directory for log files.
///
/// Priority:
/// 1. `CHESS_CLI_LOG_DIR` env variable if set
/// 2. `None`, meaning logs go to stderr
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("CHESS_CLI_LOG_DIR").ok().map(PathBuf::from)
}

/// Get the promotion policy for new sessions.
///
/// Priority:
/// 1. `CHESS_CLI_PROMOTION` env variable if set to a recognised value
/// 2. `PromotionPolicy::Require` as fallback
pub fn get_promotion_policy() -> PromotionPolicy {
    std::env::var("CHESS_CLI_PROMOTION")
        .ok()
        .and_then(|value| parse_promotion_policy(&value))
        .unwrap_or_default()
}

pub fn parse_promotion_policy(value: &str) -> Option<PromotionPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "require" | "strict" => Some(PromotionPolicy::Require),
        "queen" | "auto-queen" => Some(PromotionPolicy::AutoQueen),
        _ => None,
    }
}

/// PGN tags to set on a new game, from `CHESS_CLI_EVENT`, `CHESS_CLI_WHITE`
/// and `CHESS_CLI_BLACK`. Unset or blank variables are skipped.
pub fn get_default_tags() -> Vec<(&'static str, String)> {
    TAG_ENV_VARS
        .iter()
        .filter_map(|(tag, var)| {
            let value = std::env::var(var).ok()?;
            let value = value.trim();
            (!value.is_empty()).then(|| (*tag, value.to_string()))
        })
        .collect()
}
