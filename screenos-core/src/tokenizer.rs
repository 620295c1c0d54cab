//! Line tokenizer.
//!
//! ScreenOS statements are whitespace separated, but quoted values such as
//! zone names or comments may contain spaces. Quoted spans are merged back
//! into a single token, quotes included.
//!
//! ## Clamped access
//!
//! Every parser reads tokens speculatively past the end of a statement, so
//! [`Tokens::token_at`] returns `""` for any out-of-range position instead of
//! failing.

use serde::Serialize;

/// Ordered tokens of one configuration line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tokens(Vec<String>);

impl Tokens {
    /// Tokenize one raw line.
    pub fn new(line: &str) -> Self {
        let raw: Vec<&str> = line.split_whitespace().collect();
        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        let mut idx = 0;
        while idx < raw.len() {
            let mut token = raw[idx].to_string();
            idx += 1;
            if token.starts_with('"') && !token.ends_with('"') {
                while idx < raw.len() {
                    token.push(' ');
                    token.push_str(raw[idx]);
                    idx += 1;
                    if token.ends_with('"') {
                        break;
                    }
                }
            }
            out.push(token);
        }
        Self(out)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Token at `pos`, or `""` when out of range.
    pub fn token_at(&self, pos: usize) -> &str {
        self.0.get(pos).map(String::as_str).unwrap_or("")
    }

    /// All tokens from `pos` to the end.
    pub fn tokens_from(&self, pos: usize) -> &[String] {
        self.0.get(pos..).unwrap_or(&[])
    }

    /// Up to `count` tokens starting at `start`.
    pub fn tokens_range(&self, start: usize, count: usize) -> &[String] {
        let end = start.saturating_add(count).min(self.0.len());
        self.0.get(start..end).unwrap_or(&[])
    }

    /// Position of the first token equal to `word`.
    pub fn position_of(&self, word: &str) -> Option<usize> {
        self.0.iter().position(|t| t == word)
    }

    /// Classification key of the statement.
    ///
    /// Normally the second token; `group <x>` and `dip group` are two-word keys.
    pub fn object_word(&self) -> String {
        let words = &self.0;
        if words.len() > 2 {
            if words[1] == "group" {
                return format!("group {}", words[2]);
            }
            if words[1] == "dip" && words[2] == "group" {
                return "dip group".to_string();
            }
        }
        match words.len() {
            0 => String::new(),
            1 => words[0].clone(),
            _ => words[1].clone(),
        }
    }
}

/// True for a non-empty token that starts and ends with a double quote.
pub fn is_quoted(token: &str) -> bool {
    token.starts_with('"') && token.ends_with('"')
}

/// Strip surrounding double quotes.
pub fn unquote(token: &str) -> &str {
    token.trim_matches('"')
}
