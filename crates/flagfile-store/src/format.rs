//! Properties text format
//!
//! Line-oriented `key=value` (or `key: value`, or `key value`) entries with
//! `#`/`!` comment lines, backslash line continuations and `\uXXXX` escapes.

use crate::config::StoreOptions;
use crate::error::{StoreError, StoreResult};
use std::collections::HashMap;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// A logical line and the natural line number it started on
struct LogicalLine {
    number: usize,
    text: String,
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

/// Count trailing backslashes of a natural line
fn trailing_backslashes(line: &str) -> usize {
    line.chars().rev().take_while(|c| *c == '\\').count()
}

/// Split input into natural lines on `\n`, `\r` or `\r\n`
fn natural_lines(input: &str) -> impl Iterator<Item = &str> {
    let mut rest = input;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\n', '\r']) {
            Some(idx) => {
                let line = &rest[..idx];
                let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[idx + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

/// Join continuation lines and drop blanks and comments
fn logical_lines(input: &str) -> Vec<LogicalLine> {
    let mut result = Vec::new();
    let mut current: Option<LogicalLine> = None;

    for (idx, raw) in natural_lines(input).enumerate() {
        let trimmed = raw.trim_start_matches(is_blank);

        let mut logical = match current.take() {
            Some(mut pending) => {
                pending.text.push_str(trimmed);
                pending
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                LogicalLine {
                    number: idx + 1,
                    text: trimmed.to_string(),
                }
            }
        };

        if trailing_backslashes(&logical.text) % 2 == 1 {
            logical.text.pop();
            current = Some(logical);
        } else {
            result.push(logical);
        }
    }

    if let Some(pending) = current {
        result.push(pending);
    }

    result
}

/// Split a logical line into its raw (still escaped) key and value
fn split_entry(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut has_separator = false;
    let mut preceding_backslash = false;

    for (idx, c) in line.char_indices() {
        if preceding_backslash {
            preceding_backslash = false;
            continue;
        }
        if c == '\\' {
            preceding_backslash = true;
        } else if c == '=' || c == ':' {
            key_end = idx;
            value_start = idx + 1;
            has_separator = true;
            break;
        } else if is_blank(c) {
            key_end = idx;
            value_start = idx + c.len_utf8();
            break;
        }
    }

    let mut rest = &line[value_start..];
    loop {
        let Some(c) = rest.chars().next() else { break };
        if is_blank(c) {
            rest = &rest[c.len_utf8()..];
        } else if !has_separator && (c == '=' || c == ':') {
            has_separator = true;
            rest = &rest[1..];
        } else {
            break;
        }
    }

    (&line[..key_end], rest)
}

fn read_hex4(chars: &mut std::str::Chars<'_>, line: usize) -> StoreResult<u16> {
    let mut value: u16 = 0;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| StoreError::parse(line, "Malformed \\uxxxx encoding"))?;
        value = (value << 4) | digit as u16;
    }
    Ok(value)
}

/// Resolve backslash escapes in a raw key or value
fn unescape(raw: &str, line: usize) -> StoreResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else { break };
        match escaped {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\u{c}'),
            'u' => {
                let unit = read_hex4(&mut chars, line)?;
                if (0xD800..0xDC00).contains(&unit) {
                    // high surrogate must be followed by an escaped low surrogate
                    let low = match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => read_hex4(&mut chars, line)?,
                        _ => return Err(StoreError::parse(line, "Unpaired surrogate escape")),
                    };
                    let decoded = char::decode_utf16([unit, low])
                        .next()
                        .and_then(|r| r.ok())
                        .ok_or_else(|| StoreError::parse(line, "Unpaired surrogate escape"))?;
                    out.push(decoded);
                } else {
                    let decoded = char::from_u32(unit as u32)
                        .ok_or_else(|| StoreError::parse(line, "Unpaired surrogate escape"))?;
                    out.push(decoded);
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Decode file bytes as UTF-8, falling back to ISO-8859-1
pub fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Parse properties text into a key-value mapping
///
/// Later occurrences of a key overwrite earlier ones.
pub fn parse(input: &str) -> StoreResult<HashMap<String, String>> {
    let mut values = HashMap::new();

    for line in logical_lines(input) {
        let (raw_key, raw_value) = split_entry(&line.text);
        let key = unescape(raw_key, line.number)?;
        let value = unescape(raw_value, line.number)?;
        values.insert(key, value);
    }

    Ok(values)
}

fn push_unicode_escape(out: &mut String, unit: u16) {
    out.push_str("\\u");
    for shift in [12, 8, 4, 0] {
        out.push(HEX[((unit >> shift) & 0xF) as usize] as char);
    }
}

fn escape(text: &str, is_key: bool, escape_unicode: bool, out: &mut String) {
    for (idx, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                push_unicode_escape(out, c as u16);
            }
            c if escape_unicode && (c as u32) > 0x7e => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    push_unicode_escape(out, *unit);
                }
            }
            c => out.push(c),
        }
    }
}

/// Render a mapping as properties text
///
/// Entries are written sorted by key so that the output is deterministic.
pub fn render(values: &HashMap<String, String>, options: &StoreOptions) -> String {
    let mut out = String::new();

    if let Some(header) = &options.header {
        for line in header.lines() {
            out.push('#');
            out.push_str(line);
            out.push('\n');
        }
    }
    if options.timestamp_comment {
        out.push('#');
        out.push_str(&chrono::Utc::now().to_rfc2822());
        out.push('\n');
    }

    let mut entries: Vec<_> = values.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (key, value) in entries {
        escape(key, true, options.escape_unicode, &mut out);
        out.push('=');
        escape(value, false, options.escape_unicode, &mut out);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> HashMap<String, String> {
        parse(input).unwrap()
    }

    #[test]
    fn test_parse_separators() {
        let values = parsed("a=1\nb: 2\nc 3\nd   =   4\ne\n");

        assert_eq!(values["a"], "1");
        assert_eq!(values["b"], "2");
        assert_eq!(values["c"], "3");
        assert_eq!(values["d"], "4");
        assert_eq!(values["e"], "");
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let values = parsed("# comment\n! also comment\n\n   \n  # indented\nkey=value\n");

        assert_eq!(values.len(), 1);
        assert_eq!(values["key"], "value");
    }

    #[test]
    fn test_parse_line_endings() {
        let values = parsed("a=1\r\nb=2\rc=3");
        assert_eq!(values.len(), 3);
        assert_eq!(values["c"], "3");
    }

    #[test]
    fn test_parse_continuation() {
        let values = parsed("fruits=apple, \\\n    banana, \\\n    cherry\nnext=1\n");

        assert_eq!(values["fruits"], "apple, banana, cherry");
        assert_eq!(values["next"], "1");
    }

    #[test]
    fn test_even_backslashes_do_not_continue() {
        let values = parsed("path=c:\\\\\nnext=1\n");

        assert_eq!(values["path"], "c:\\");
        assert_eq!(values["next"], "1");
    }

    #[test]
    fn test_continuation_at_end_of_input() {
        let values = parsed("key=value\\");
        assert_eq!(values["key"], "value");
    }

    #[test]
    fn test_parse_escapes() {
        let values = parsed("my\\ key\\=x=tab\\there\\nnewline\nunicode=caf\\u00E9\n");

        assert_eq!(values["my key=x"], "tab\there\nnewline");
        assert_eq!(values["unicode"], "café");
    }

    #[test]
    fn test_parse_surrogate_pair() {
        let values = parsed("emoji=\\uD83D\\uDE00\n");
        assert_eq!(values["emoji"], "😀");
    }

    #[test]
    fn test_malformed_unicode_escape_is_error() {
        let err = parse("ok=1\nbad=\\u12G4\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_unpaired_surrogate_is_error() {
        let err = parse("bad=\\uD83Dx\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_decode_utf8() {
        let text = decode("label=café 😀\n".as_bytes().to_vec());
        assert_eq!(text, "label=café 😀\n");
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        let text = decode(b"FEATURE=on\nlabel=caf\xe9 \xff\n".to_vec());
        assert_eq!(text, "FEATURE=on\nlabel=café ÿ\n");

        let values = parsed(&text);
        assert_eq!(values["FEATURE"], "on");
        assert_eq!(values["label"], "café ÿ");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let values = parsed("a=1\na=2\n");
        assert_eq!(values["a"], "2");
    }

    #[test]
    fn test_render_sorted_and_escaped() {
        let mut values = HashMap::new();
        values.insert("b key".to_string(), " leading space".to_string());
        values.insert("a".to_string(), "x=y:z#!".to_string());

        let text = render(&values, &StoreOptions::default());
        assert_eq!(text, "a=x\\=y\\:z\\#\\!\nb\\ key=\\ leading space\n");
    }

    #[test]
    fn test_render_unicode_modes() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), "café 😀".to_string());

        let escaped = render(&values, &StoreOptions::default());
        assert_eq!(escaped, "name=caf\\u00E9 \\uD83D\\uDE00\n");

        let options = StoreOptions {
            escape_unicode: false,
            ..StoreOptions::default()
        };
        let verbatim = render(&values, &options);
        assert_eq!(verbatim, "name=café 😀\n");
    }

    #[test]
    fn test_render_header_and_timestamp() {
        let mut values = HashMap::new();
        values.insert("k".to_string(), "v".to_string());

        let options = StoreOptions {
            header: Some("Feature states\nmanaged file".to_string()),
            timestamp_comment: true,
            ..StoreOptions::default()
        };
        let text = render(&values, &options);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "#Feature states");
        assert_eq!(lines[1], "#managed file");
        assert!(lines[2].starts_with('#'));
        assert_eq!(lines[3], "k=v");
        assert_eq!(parsed(&text), values);
    }

    #[test]
    fn test_render_then_parse_preserves_awkward_values() {
        let mut values = HashMap::new();
        values.insert("FEATURE_ONE".to_string(), "true".to_string());
        values.insert("FEATURE_ONE.strategy".to_string(), "gradual".to_string());
        values.insert("with\\backslash".to_string(), "multi\nline\tvalue\\".to_string());
        values.insert("#notcomment".to_string(), "!bang".to_string());
        values.insert("ctrl".to_string(), "\u{1}\u{7f}".to_string());
        values.insert("empty".to_string(), String::new());

        for escape_unicode in [true, false] {
            let options = StoreOptions {
                escape_unicode,
                ..StoreOptions::default()
            };
            assert_eq!(parsed(&render(&values, &options)), values);
        }
    }
}
