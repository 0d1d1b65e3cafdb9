//! Parser for `.properties` documents.
//!
//! Supported syntax:
//!
//! - Lines whose first non-blank character is `#` or `!` are comments.
//! - A key ends at the first unescaped `=`, `:` or whitespace. Whitespace
//!   around the separator is skipped.
//! - A line ending in an odd number of backslashes continues on the next
//!   line; leading whitespace of the continuation is dropped.
//! - Escapes `\t`, `\n`, `\r`, `\f` and `\uXXXX` are decoded in keys and
//!   values. Any other escaped character stands for itself.
//!
//! Entries are returned in document order. Repeated keys are kept; the
//! caller decides precedence.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertiesError {
    #[error("line {line}: malformed \\uXXXX escape")]
    MalformedUnicodeEscape { line: usize },

    #[error("line {line}: \\u{code:04X} is not a valid character")]
    InvalidCharacter { line: usize, code: u32 },
}

/// Parse a document into `(key, value)` pairs.
pub fn parse(content: &str) -> Result<Vec<(String, String)>, PropertiesError> {
    let mut entries = Vec::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let start = line.trim_start();
        if start.is_empty() || start.starts_with('#') || start.starts_with('!') {
            continue;
        }

        let mut logical = String::from(start);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let line_number = index + 1;
        let (raw_key, raw_value) = split_entry(&logical);
        entries.push((
            unescape(raw_key, line_number)?,
            unescape(raw_value, line_number)?,
        ));
    }
    Ok(entries)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line into raw key and raw value (still escaped).
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                let value = line[i + 1..].trim_start();
                return (&line[..i], value);
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(after) = rest.strip_prefix(['=', ':']) {
        rest = after.trim_start();
    }
    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(PropertiesError::MalformedUnicodeEscape { line });
                }
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| PropertiesError::MalformedUnicodeEscape { line })?;
                let decoded =
                    char::from_u32(code).ok_or(PropertiesError::InvalidCharacter { line, code })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(content: &str) -> Vec<(String, String)> {
        parse(content).unwrap()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn separators() {
        let entries = pairs("a=1\nb : 2\nc 3\nd\t=\t4\n");
        assert_eq!(
            entries,
            vec![pair("a", "1"), pair("b", "2"), pair("c", "3"), pair("d", "4")]
        );
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let entries = pairs("# comment\n! also comment\n\n   \nkey=value\n");
        assert_eq!(entries, vec![pair("key", "value")]);
    }

    #[test]
    fn value_keeps_inner_and_trailing_text() {
        let entries = pairs("greeting = hello world \n");
        assert_eq!(entries, vec![pair("greeting", "hello world ")]);
    }

    #[test]
    fn key_without_value() {
        let entries = pairs("empty\nalso=\n");
        assert_eq!(entries, vec![pair("empty", ""), pair("also", "")]);
    }

    #[test]
    fn dotted_keys_are_kept_verbatim() {
        let entries = pairs("database.pool.size=10\n");
        assert_eq!(entries, vec![pair("database.pool.size", "10")]);
    }

    #[test]
    fn continuation_lines_are_joined() {
        let entries = pairs("list = a,\\\n       b,\\\n       c\nnext=1\n");
        assert_eq!(entries, vec![pair("list", "a,b,c"), pair("next", "1")]);
    }

    #[test]
    fn escaped_backslash_is_not_a_continuation() {
        let entries = pairs("path=C:\\\\\nnext=1\n");
        assert_eq!(entries, vec![pair("path", "C:\\"), pair("next", "1")]);
    }

    #[test]
    fn escapes_are_decoded() {
        let entries = pairs("k=a\\tb\\nc\\u0041\\=\n");
        assert_eq!(entries, vec![pair("k", "a\tb\ncA=")]);
    }

    #[test]
    fn escaped_separator_in_key() {
        let entries = pairs("a\\=b=c\nx\\ y=z\n");
        assert_eq!(entries, vec![pair("a=b", "c"), pair("x y", "z")]);
    }

    #[test]
    fn malformed_unicode_escape_reports_line() {
        let result = parse("ok=1\nbad=\\u12G4\n");
        assert_eq!(result, Err(PropertiesError::MalformedUnicodeEscape { line: 2 }));
        let result = parse("short=\\u12\n");
        assert_eq!(result, Err(PropertiesError::MalformedUnicodeEscape { line: 1 }));
    }

    #[test]
    fn surrogate_is_invalid_character() {
        let result = parse("k=\\uD800\n");
        assert!(matches!(
            result,
            Err(PropertiesError::InvalidCharacter { code: 0xD800, .. })
        ));
    }

    #[test]
    fn repeated_keys_are_all_returned() {
        let entries = pairs("a=1\na=2\n");
        assert_eq!(entries, vec![pair("a", "1"), pair("a", "2")]);
    }
}
