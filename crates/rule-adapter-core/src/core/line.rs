// crates/rule-adapter-core/src/core/line.rs
// ============================================================================
// Module: Policy Line Text
// Description: Escaping and parsing of comma-separated policy lines.
// Purpose: Keep values containing separators or quotes intact across lines.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Policy lines are `ptype, v0, v1, ...` with CSV-style quoting. A quoted
//! field may contain commas; an embedded quote is written as `""`.
//!
//! [`escape_value`] leaves values that are already quote-delimited untouched
//! and wraps everything else, so escaping is idempotent on stored values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Quote character used to delimit escaped fields.
const QUOTE: char = '"';
/// Field separator.
const SEPARATOR: char = ',';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures parsing a policy line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyLineError {
    /// The line holds no fields.
    #[error("policy line is empty")]
    Empty,
    /// A quoted field was never closed.
    #[error("unterminated quoted field in policy line")]
    UnterminatedQuote,
    /// A closing quote was followed by something other than a separator.
    #[error("unexpected character {0:?} after quoted field")]
    TrailingCharacter(char),
}

// ============================================================================
// SECTION: Escaping
// ============================================================================

/// Returns true when the value is already a quote-delimited field.
#[must_use]
pub fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with(QUOTE) && value.ends_with(QUOTE)
}

/// Quotes a value for inclusion in a policy line.
///
/// Already-quoted values pass through unchanged; otherwise the value is
/// wrapped in quotes with embedded quotes doubled.
///
/// The pass-through trusts the value to be a single well-formed quoted
/// field. A raw value that merely starts and ends with a quote, such as
/// `"a","b"`, is emitted verbatim and parses back as two fields.
#[must_use]
pub fn escape_value(value: &str) -> Cow<'_, str> {
    if is_quoted(value) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push(QUOTE);
    for ch in value.chars() {
        if ch == QUOTE {
            escaped.push(QUOTE);
        }
        escaped.push(ch);
    }
    escaped.push(QUOTE);
    Cow::Owned(escaped)
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Splits a policy line into its fields.
///
/// Unquoted fields are trimmed. Quoted fields keep their inner whitespace
/// and unescape `""` to `"`.
///
/// # Errors
///
/// Returns [`PolicyLineError`] when the line is blank or has malformed quotes.
pub fn parse_policy_line(line: &str) -> Result<Vec<String>, PolicyLineError> {
    if line.trim().is_empty() {
        return Err(PolicyLineError::Empty);
    }
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();
    'fields: loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        let mut field = String::new();
        if chars.next_if_eq(&QUOTE).is_some() {
            loop {
                match chars.next() {
                    None => return Err(PolicyLineError::UnterminatedQuote),
                    Some(QUOTE) => {
                        if chars.next_if_eq(&QUOTE).is_some() {
                            field.push(QUOTE);
                        } else {
                            break;
                        }
                    }
                    Some(ch) => field.push(ch),
                }
            }
            while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
            fields.push(field);
            match chars.next() {
                None => break 'fields,
                Some(SEPARATOR) => {}
                Some(ch) => return Err(PolicyLineError::TrailingCharacter(ch)),
            }
        } else {
            loop {
                match chars.next() {
                    None => {
                        fields.push(field.trim_end().to_string());
                        break 'fields;
                    }
                    Some(SEPARATOR) => {
                        fields.push(field.trim_end().to_string());
                        break;
                    }
                    Some(ch) => field.push(ch),
                }
            }
        }
    }
    Ok(fields)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_wraps_plain_values() {
        assert_eq!(escape_value("alice"), "\"alice\"");
        assert_eq!(escape_value(""), "\"\"");
    }

    #[test]
    fn escape_passes_quoted_values_through() {
        assert_eq!(escape_value("\"a,b\""), "\"a,b\"");
    }

    #[test]
    fn quote_delimited_raw_values_do_not_round_trip() {
        let raw = "\"a\",\"b\"";
        assert_eq!(escape_value(raw), raw);
        let line = format!("p, {}", escape_value(raw));
        assert_eq!(parse_policy_line(&line).unwrap(), vec!["p", "a", "b"]);
    }

    #[test]
    fn escape_doubles_embedded_quotes() {
        assert_eq!(escape_value("say \"hi\" now"), "\"say \"\"hi\"\" now\"");
        assert_eq!(escape_value("\""), "\"\"\"\"");
    }

    #[test]
    fn parse_trims_unquoted_fields() {
        let fields = parse_policy_line("p,  alice , data1,read").unwrap();
        assert_eq!(fields, vec!["p", "alice", "data1", "read"]);
    }

    #[test]
    fn parse_keeps_commas_inside_quotes() {
        let fields = parse_policy_line("p, \"a, b\", \"\", \"x\"\"y\"").unwrap();
        assert_eq!(fields, vec!["p", "a, b", "", "x\"y"]);
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!(parse_policy_line("   "), Err(PolicyLineError::Empty));
        assert_eq!(parse_policy_line("p, \"open"), Err(PolicyLineError::UnterminatedQuote));
        assert_eq!(parse_policy_line("p, \"a\"b"), Err(PolicyLineError::TrailingCharacter('b')));
    }
}
