//! Signal strings and the signal-to-character table
//!
//! A signal string spells a classified symbol stream with `.` for dots, `_`
//! for dashes, a single space between letters and ` ; ` between words.
//! Inter-element gaps are not written.

use crate::error::{Error, Result};
use crate::types::Symbol;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Shown in place of a signal token that is not in the table
pub const UNKNOWN_SYMBOL: &str = "_?_";

const STANDARD_TABLE: &str = include_str!("cwtable.dat");

static STANDARD: OnceLock<SymbolTable> = OnceLock::new();

/// Spell a symbol stream as a signal string
pub fn signal_string(symbols: &[Symbol]) -> String {
    let mut signal = String::new();
    for symbol in symbols {
        match symbol {
            Symbol::Dot => signal.push('.'),
            Symbol::Dash => signal.push('_'),
            Symbol::IntraSpace => {}
            Symbol::LetterSpace => signal.push(' '),
            Symbol::WordSpace => signal.push_str(" ; "),
        }
    }
    signal
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    decode: HashMap<String, String>,
    encode: HashMap<char, String>,
}

impl SymbolTable {
    /// Build a table from lines of `<character><signal tokens>`.
    ///
    /// Blank lines are skipped and the first entry for a token wins. The empty
    /// token and `;` always decode to a space.
    pub fn parse(resource: &str) -> Result<Self> {
        let mut decode = HashMap::new();
        let mut encode = HashMap::new();

        for (number, raw) in resource.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let mut chars = line.chars();
            let glyph = match chars.next() {
                Some(c) => c,
                None => continue,
            };
            let token = chars.as_str();
            if token.is_empty() {
                return Err(Error::SymbolTable {
                    line: number + 1,
                    reason: format!("no signal tokens after '{glyph}'"),
                });
            }
            if let Some(bad) = token.chars().find(|c| !matches!(c, '.' | '_')) {
                return Err(Error::SymbolTable {
                    line: number + 1,
                    reason: format!("unexpected '{bad}' in signal tokens"),
                });
            }

            decode
                .entry(token.to_string())
                .or_insert_with(|| glyph.to_string());
            encode.entry(glyph).or_insert_with(|| token.to_string());
        }

        decode.insert(String::new(), " ".to_string());
        decode.insert(";".to_string(), " ".to_string());

        Ok(Self { decode, encode })
    }

    /// Parse a table, falling back to an empty one that decodes every token
    /// as [`UNKNOWN_SYMBOL`]
    fn parse_or_empty(resource: &str) -> Self {
        Self::parse(resource).unwrap_or_else(|e| {
            warn!("symbol table rejected, decoding without one: {e}");
            Self {
                decode: HashMap::new(),
                encode: HashMap::new(),
            }
        })
    }

    /// The built-in ITU table, parsed once
    pub fn standard() -> &'static SymbolTable {
        STANDARD.get_or_init(|| Self::parse_or_empty(STANDARD_TABLE))
    }

    pub fn len(&self) -> usize {
        self.encode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encode.is_empty()
    }

    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.decode.get(token).map(String::as_str)
    }

    /// Signal tokens for a character, case-insensitive for letters
    pub fn encode(&self, glyph: char) -> Option<&str> {
        self.encode
            .get(&glyph)
            .or_else(|| self.encode.get(&glyph.to_ascii_uppercase()))
            .map(String::as_str)
    }

    /// Translate a signal string to text. Unknown tokens become
    /// [`UNKNOWN_SYMBOL`].
    pub fn decode(&self, signal: &str) -> String {
        signal
            .split(' ')
            .map(|token| self.lookup(token).unwrap_or(UNKNOWN_SYMBOL))
            .collect()
    }
}
