use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::GameResult;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([A-Za-z0-9_]+)\s+"((?:[^"\\]|\\.)*)"\s*$"#).expect("tag pattern is valid")
});

static MOVE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.+").expect("move number pattern is valid"));

/// A parsed PGN game
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    /// Tag pairs in the order they appeared.
    pub tags: Vec<(String, String)>,
    pub moves: Vec<PgnMove>,
    /// Game termination marker, if the movetext had one.
    pub result: Option<GameResult>,
}

impl PgnGame {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A single move in PGN with metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnMove {
    pub san: String,
    pub comment: Option<String>,
    pub nags: Vec<u8>, // Numeric Annotation Glyphs (!!, ?, etc.)
}

/// Parse a PGN string into a game
///
/// Only the first game in `input` is read. Recursive annotation variations
/// are skipped; comments attach to the move they follow.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    let mut game = PgnGame::default();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '[' => {
                if !game.moves.is_empty() {
                    // Start of the next game.
                    break;
                }
                chars.next();
                let body = take_until(&mut chars, input, ']').ok_or(PgnError::InvalidFormat)?;
                game.tags.push(parse_tag(body)?);
            }
            '{' => {
                chars.next();
                let body =
                    take_until(&mut chars, input, '}').ok_or(PgnError::UnterminatedComment)?;
                attach_comment(&mut game, body);
            }
            ';' => {
                chars.next();
                let body = take_until(&mut chars, input, '\n').unwrap_or(&input[start + 1..]);
                attach_comment(&mut game, body);
            }
            // Escape lines start in the first column and run to end of line.
            '%' if start == 0 || input[..start].ends_with('\n') => {
                let _ = take_until(&mut chars, input, '\n');
            }
            '(' => {
                chars.next();
                skip_variation(&mut chars)?;
            }
            ')' => return Err(PgnError::UnbalancedVariation),
            '}' | ']' | '%' => return Err(PgnError::UnexpectedChar(c)),
            '$' => {
                chars.next();
                let digits = take_while(&mut chars, input, |c| c.is_ascii_digit());
                let nag = digits
                    .parse()
                    .map_err(|_| PgnError::InvalidNag(digits.to_string()))?;
                game.moves
                    .last_mut()
                    .ok_or_else(|| PgnError::InvalidNag(digits.to_string()))?
                    .nags
                    .push(nag);
            }
            _ => {
                let token = take_while(&mut chars, input, |c| {
                    !c.is_whitespace() && !matches!(c, '[' | ']' | '{' | '}' | '(' | ')' | ';' | '$')
                });
                if token.is_empty() {
                    return Err(PgnError::UnexpectedChar(c));
                }
                if let Some(result) = GameResult::from_token(token) {
                    game.result = Some(result);
                    break;
                }
                push_move_token(&mut game, token);
            }
        }
    }

    Ok(game)
}

fn push_move_token(game: &mut PgnGame, token: &str) {
    let token = MOVE_NUMBER.replace(token, "");
    if token.is_empty() || token.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return;
    }

    let san = token.trim_end_matches(['!', '?']);
    let glyph = &token[san.len()..];
    let nags = match glyph {
        "!" => vec![1],
        "?" => vec![2],
        "!!" => vec![3],
        "??" => vec![4],
        "!?" => vec![5],
        "?!" => vec![6],
        _ => Vec::new(),
    };

    game.moves.push(PgnMove {
        san: san.to_string(),
        comment: None,
        nags,
    });
}

fn attach_comment(game: &mut PgnGame, body: &str) {
    let text = body.trim();
    if text.is_empty() {
        return;
    }
    let Some(last) = game.moves.last_mut() else {
        return;
    };
    match &mut last.comment {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => last.comment = Some(text.to_string()),
    }
}

fn parse_tag(body: &str) -> Result<(String, String), PgnError> {
    let caps = TAG_PATTERN
        .captures(body)
        .ok_or_else(|| PgnError::InvalidTag(body.to_string()))?;
    let mut value = String::new();
    let mut escaped = false;
    for c in caps[2].chars() {
        if escaped || c != '\\' {
            value.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    Ok((caps[1].to_string(), value))
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

/// Consume up to and including `end`, returning the text before it.
fn take_until<'a>(chars: &mut Chars<'_>, input: &'a str, end: char) -> Option<&'a str> {
    let start = chars.peek().map(|&(i, _)| i).unwrap_or(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in chars.by_ref() {
        // Tag values may contain a closing bracket inside quotes.
        if end == ']' && in_string && c == '\\' && !escaped {
            escaped = true;
            continue;
        }
        if end == ']' && c == '"' && !escaped {
            in_string = !in_string;
        }
        escaped = false;
        if c == end && !in_string {
            return Some(&input[start..i]);
        }
    }
    None
}

fn take_while<'a>(chars: &mut Chars<'_>, input: &'a str, keep: impl Fn(char) -> bool) -> &'a str {
    let start = chars.peek().map(|&(i, _)| i).unwrap_or(input.len());
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !keep(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    &input[start..end]
}

fn skip_variation(chars: &mut Chars<'_>) -> Result<(), PgnError> {
    let mut depth = 1;
    let mut in_comment = false;
    for (_, c) in chars.by_ref() {
        match c {
            '{' => in_comment = true,
            '}' => in_comment = false,
            '(' if !in_comment => depth += 1,
            ')' if !in_comment => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
    Err(PgnError::UnbalancedVariation)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid PGN format")]
    InvalidFormat,
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Unbalanced variation")]
    UnbalancedVariation,
    #[error("Invalid NAG: ${0}")]
    InvalidNag(String),
    #[error("Unexpected character: {0:?}")]
    UnexpectedChar(char),
}
