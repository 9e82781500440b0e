//! Inbound line parsing
//!
//! Splits a raw line into a command token and its remainder. The first
//! whitespace-delimited token, lower-cased, selects the command; the
//! remainder is taken by position so text repeating the command word is
//! left untouched.

/// A parsed client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Empty or whitespace-only line
    Blank,
    /// `/exit`
    Exit,
    /// `/name <new name>`
    Rename(&'a str),
    /// `/list`
    List,
    /// `/whisper <recipient> <body>`
    Whisper { target: &'a str, body: &'a str },
    /// Anything else: the whole line as a chat message
    Say(&'a str),
}

/// Parse one inbound line.
pub fn parse(line: &str) -> Command<'_> {
    let (token, rest) = split_first_token(line);
    if token.is_empty() {
        return Command::Blank;
    }

    match token.to_lowercase().as_str() {
        "/exit" => Command::Exit,
        "/name" => Command::Rename(rest),
        "/list" => Command::List,
        "/whisper" => {
            let (target, body) = split_first_token(rest);
            Command::Whisper { target, body }
        }
        _ => Command::Say(line),
    }
}

/// Returns the first whitespace-delimited token and the trimmed text after it.
fn split_first_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    let (token, rest) = text.split_at(end);
    (token, rest.trim())
}
