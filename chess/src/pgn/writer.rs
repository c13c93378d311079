use crate::fen::format_fen;
use crate::position::Position;
use crate::rules::GameResult;

const MAX_LINE: usize = 80;

/// Tags every exported game carries, in this order.
pub const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

fn roster_default(name: &str) -> &'static str {
    match name {
        "Date" => "????.??.??",
        _ => "?",
    }
}

/// Write a game as PGN
///
/// `sans` are the moves in order from `start`. The `Result` tag is always
/// taken from `result`; any `SetUp`/`FEN` tags in `tags` are replaced by
/// ones derived from `start`.
pub fn write_pgn(
    tags: &[(String, String)],
    start: &Position,
    sans: &[String],
    result: GameResult,
) -> String {
    let mut out = String::new();
    let lookup = |name: &str| {
        tags.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    for name in SEVEN_TAG_ROSTER {
        let value = match name {
            "Result" => result.as_str(),
            _ => lookup(name).unwrap_or(roster_default(name)),
        };
        push_tag(&mut out, name, value);
    }

    if *start != Position::starting() {
        push_tag(&mut out, "SetUp", "1");
        push_tag(&mut out, "FEN", &format_fen(start));
    }

    for (name, value) in tags {
        if SEVEN_TAG_ROSTER.contains(&name.as_str()) || name == "SetUp" || name == "FEN" {
            continue;
        }
        push_tag(&mut out, name, value);
    }

    out.push('\n');

    let mut tokens = Vec::with_capacity(sans.len() * 3 / 2 + 1);
    let mut number = start.fullmove_number();
    let mut white_to_move = start.side_to_move() == chess_common::Color::White;
    for (i, san) in sans.iter().enumerate() {
        if white_to_move {
            tokens.push(format!("{number}."));
        } else if i == 0 {
            tokens.push(format!("{number}..."));
        }
        tokens.push(san.clone());
        if !white_to_move {
            number += 1;
        }
        white_to_move = !white_to_move;
    }
    tokens.push(result.as_str().to_string());

    let mut line = String::new();
    for token in tokens {
        if !line.is_empty() && line.len() + 1 + token.len() > MAX_LINE {
            out.push_str(&line);
            out.push('\n');
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    out.push_str(&line);
    out.push('\n');
    out
}

fn push_tag(out: &mut String, name: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    out.push_str(&format!("[{name} \"{escaped}\"]\n"));
}
