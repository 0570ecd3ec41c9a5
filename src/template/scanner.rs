use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::SqlTemplateError;

use super::{LEFT_DELIM, RIGHT_DELIM};

/// Raw pieces of a template: literal text and the bodies of `/*% ... %*/` actions.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Segment {
    Text(String),
    Action(String),
}

/// Lexical tokens of an action body.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Ident(String),
    /// Dotted reference without its leading dot (`.a.b` -> `a.b`).
    Field(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
}

/// Split template text into text and action segments, applying `/*%- ` and ` -%*/` trim markers.
pub(super) fn split(text: &str) -> Result<Vec<Segment>, SqlTemplateError> {
    let mut segments = Vec::new();
    let mut rest = text;
    let mut trim_next = false;

    while !rest.is_empty() {
        let Some(start) = rest.find(LEFT_DELIM) else {
            push_text(&mut segments, rest, trim_next, false);
            break;
        };

        let mut body_start = start + LEFT_DELIM.len();
        let trim_prev = has_left_trim(&rest[body_start..]);
        if trim_prev {
            body_start += 1;
        }
        push_text(&mut segments, &rest[..start], trim_next, trim_prev);

        let after = &rest[body_start..];
        let end = find_action_end(after).ok_or_else(|| {
            SqlTemplateError::TemplateSyntax(format!(
                "unclosed action starting at {:?}",
                truncate(&rest[start..])
            ))
        })?;
        let mut body = &after[..end];
        trim_next = has_right_trim(body);
        if trim_next {
            body = &body[..body.len() - 1];
        }
        segments.push(Segment::Action(body.to_string()));
        rest = &after[end + RIGHT_DELIM.len()..];
    }

    Ok(segments)
}

fn push_text(segments: &mut Vec<Segment>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn has_left_trim(body: &str) -> bool {
    let mut chars = body.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn has_right_trim(body: &str) -> bool {
    let mut chars = body.chars().rev();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// Byte offset of the closing delimiter, skipping quoted strings inside the action.
fn find_action_end(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'"' => idx = skip_quoted(bytes, idx, b'"', true)?,
            b'`' => idx = skip_quoted(bytes, idx, b'`', false)?,
            _ if bytes[idx..].starts_with(RIGHT_DELIM.as_bytes()) => return Some(idx),
            _ => {}
        }
        idx += 1;
    }
    None
}

/// Index of the closing quote for the string opened at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, escapes: bool) -> Option<usize> {
    let mut idx = start + 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' if escapes => idx += 1,
            b if b == quote => return Some(idx),
            _ => {}
        }
        idx += 1;
    }
    None
}

fn truncate(text: &str) -> String {
    text.chars().take(24).collect()
}

/// Tokenize the body of one action.
pub(super) fn tokenize(body: &str) -> Result<Vec<Token>, SqlTemplateError> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(idx, c)) = chars.peek() {
        match c {
            _ if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                let (text, end) = scan_string(body, idx)?;
                tokens.push(Token::Str(text));
                advance_to(&mut chars, end);
            }
            '`' => {
                let close = body[idx + 1..].find('`').ok_or_else(|| {
                    SqlTemplateError::TemplateSyntax(format!("unterminated raw string in {body:?}"))
                })?;
                tokens.push(Token::Str(body[idx + 1..idx + 1 + close].to_string()));
                advance_to(&mut chars, idx + close + 2);
            }
            '.' => {
                let end = scan_path(body, idx);
                if end == idx + 1 {
                    return Err(SqlTemplateError::TemplateSyntax(format!(
                        "unsupported bare '.' in {body:?}"
                    )));
                }
                tokens.push(Token::Field(body[idx + 1..end].to_string()));
                advance_to(&mut chars, end);
            }
            _ if c.is_ascii_digit() || ((c == '-' || c == '+') && starts_number(body, idx)) => {
                let end = scan_number(body, idx);
                tokens.push(parse_number(&body[idx..end])?);
                advance_to(&mut chars, end);
            }
            _ if is_ident_char(c) => {
                let end = body[idx..]
                    .find(|ch: char| !is_ident_char(ch))
                    .map_or(body.len(), |off| idx + off);
                tokens.push(Token::Ident(body[idx..end].to_string()));
                advance_to(&mut chars, end);
            }
            _ => {
                return Err(SqlTemplateError::TemplateSyntax(format!(
                    "unexpected character {c:?} in {body:?}"
                )));
            }
        }
    }

    Ok(tokens)
}

fn advance_to(chars: &mut Peekable<CharIndices<'_>>, end: usize) {
    while chars.peek().is_some_and(|&(i, _)| i < end) {
        chars.next();
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn scan_path(body: &str, start: usize) -> usize {
    let mut end = start;
    let bytes = body.as_bytes();
    while end < bytes.len() && bytes[end] == b'.' {
        let seg_start = end + 1;
        let seg_end = body[seg_start..]
            .find(|ch: char| !is_ident_char(ch))
            .map_or(body.len(), |off| seg_start + off);
        if seg_end == seg_start {
            break;
        }
        end = seg_end;
    }
    if end == start { start + 1 } else { end }
}

fn starts_number(body: &str, idx: usize) -> bool {
    body[idx + 1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

fn scan_number(body: &str, start: usize) -> usize {
    let bytes = body.as_bytes();
    let mut idx = start + 1;
    while idx < bytes.len() && (bytes[idx].is_ascii_digit() || bytes[idx] == b'.') {
        idx += 1;
    }
    idx
}

fn parse_number(text: &str) -> Result<Token, SqlTemplateError> {
    let invalid = || SqlTemplateError::TemplateSyntax(format!("invalid number {text:?}"));
    if text.contains('.') {
        text.parse().map(Token::Float).map_err(|_| invalid())
    } else {
        text.parse().map(Token::Int).map_err(|_| invalid())
    }
}

/// Decode the double-quoted string at `start`; returns the text and the index after the quote.
fn scan_string(body: &str, start: usize) -> Result<(String, usize), SqlTemplateError> {
    let mut out = String::new();
    let mut chars = body[start + 1..].char_indices();
    while let Some((off, c)) = chars.next() {
        match c {
            '"' => return Ok((out, start + 1 + off + 1)),
            '\\' => match chars.next().map(|(_, e)| e) {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(e @ ('"' | '\\' | '\'')) => out.push(e),
                other => {
                    return Err(SqlTemplateError::TemplateSyntax(format!(
                        "invalid escape {other:?} in {body:?}"
                    )));
                }
            },
            _ => out.push(c),
        }
    }
    Err(SqlTemplateError::TemplateSyntax(format!(
        "unterminated string in {body:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_and_actions() {
        let segments = split(r#"a = /*%p "id" %*/ and b"#).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("a = ".into()),
                Segment::Action(r#"p "id" "#.into()),
                Segment::Text(" and b".into()),
            ]
        );
    }

    #[test]
    fn applies_trim_markers() {
        let segments = split("x\n\t/*%- if .a -%*/\n  y").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("x".into()),
                Segment::Action(" if .a ".into()),
                Segment::Text("y".into()),
            ]
        );
    }

    #[test]
    fn delimiter_inside_string_is_not_a_close() {
        let segments = split(r#"/*% p "a%*/b" %*/"#).unwrap();
        assert_eq!(segments, vec![Segment::Action(r#" p "a%*/b" "#.into())]);
    }

    #[test]
    fn reports_unclosed_action() {
        assert!(matches!(
            split("select /*% p \"id\""),
            Err(SqlTemplateError::TemplateSyntax(_))
        ));
    }

    #[test]
    fn plain_comments_pass_through() {
        let segments = split("select 1 /* note */").unwrap();
        assert_eq!(segments, vec![Segment::Text("select 1 /* note */".into())]);
    }

    #[test]
    fn tokenizes_action_bodies() {
        let tokens = tokenize(r#"paging 3 -50 1.5 .user.Name (p "x\"y") `raw`"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("paging".into()),
                Token::Int(3),
                Token::Int(-50),
                Token::Float(1.5),
                Token::Field("user.Name".into()),
                Token::LParen,
                Token::Ident("p".into()),
                Token::Str("x\"y".into()),
                Token::RParen,
                Token::Str("raw".into()),
            ]
        );
    }

    #[test]
    fn rejects_bare_dot() {
        assert!(tokenize(" . ").is_err());
    }
}
