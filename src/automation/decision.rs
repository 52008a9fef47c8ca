//! Answer logic: two recognised numbers → comparison symbol.
//!
//! Parsing and deciding are separate so a malformed OCR result is reported
//! as such instead of producing a wrong answer.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{BotError, Result};

/// The three answers the game accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Greater,
    Less,
    Equal,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Greater => '>',
            Symbol::Less => '<',
            Symbol::Equal => '=',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Symbol {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(Symbol::Greater),
            "<" => Ok(Symbol::Less),
            "=" => Ok(Symbol::Equal),
            other => Err(BotError::UnknownSymbol(other.to_string())),
        }
    }
}

/// A non-negative integer of any length, kept as its decimal digits.
///
/// Leading zeros are stripped, so comparing by length and then by digits
/// orders operands numerically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operand(String);

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand(value.to_string())
    }
}

impl FromStr for Operand {
    type Err = BotError;

    fn from_str(fragment: &str) -> Result<Self> {
        if fragment.is_empty() || !fragment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BotError::MalformedOperand(format!("{:?}", fragment)));
        }
        let trimmed = fragment.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        Ok(Operand(digits.to_string()))
    }
}

impl Ord for Operand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Operand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses exactly two digit-only fragments into operands.
pub fn parse_operands<S: AsRef<str>>(fragments: &[S]) -> Result<(Operand, Operand)> {
    let [a, b] = fragments else {
        return Err(BotError::MalformedOperand(format!(
            "expected 2 fragments, got {}",
            fragments.len()
        )));
    };
    Ok((a.as_ref().parse()?, b.as_ref().parse()?))
}

/// Picks the symbol that makes `a ? b` true.
pub fn decide(a: &Operand, b: &Operand) -> Symbol {
    match a.cmp(b) {
        Ordering::Greater => Symbol::Greater,
        Ordering::Less => Symbol::Less,
        Ordering::Equal => Symbol::Equal,
    }
}
