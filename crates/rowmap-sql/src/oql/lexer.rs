use rowmap_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Keyword, alias, entity, field or function name
    Ident,
    Number,
    /// Quoted string literal, quotes included
    Str,
    /// Named parameter, text excludes the leading `:`
    Param,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
    /// Whitespace precedes the token in the source
    pub(crate) space_before: bool,
}

impl Token<'_> {
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(keyword)
    }

    pub(crate) fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }
}

const TWO_CHAR_PUNCT: &[&str] = &["<=", ">=", "<>", "!=", "::", "||"];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token<'_>>> {
    let bytes = src.as_bytes();
    let mut tokens = vec![];
    let mut pos = 0;
    let mut space_before = false;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        let kind = if c.is_ascii_whitespace() {
            space_before = true;
            pos += 1;
            continue;
        } else if is_ident_start(c) {
            pos += 1;
            while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                pos += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            pos += 1;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            TokenKind::Number
        } else if c == b'\'' || c == b'"' {
            pos = string_end(bytes, pos).ok_or_else(|| {
                Error::query("unterminated string literal", &src[start..])
            })?;
            TokenKind::Str
        } else if c == b':'
            && bytes.get(pos + 1).is_some_and(|&next| is_ident_start(next))
        {
            pos += 1;
            while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Param,
                text: &src[start + 1..pos],
                space_before,
            });
            space_before = false;
            continue;
        } else {
            let two = src.get(pos..pos + 2);
            if two.is_some_and(|two| TWO_CHAR_PUNCT.contains(&two)) {
                pos += 2;
            } else {
                // Advance a full character so multi-byte input never splits
                pos += src[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
            }
            TokenKind::Punct
        };

        tokens.push(Token {
            kind,
            text: &src[start..pos],
            space_before,
        });
        space_before = false;
    }

    Ok(tokens)
}

/// Writes tokens back out, collapsing whitespace to single spaces.
pub(crate) fn join(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && token.space_before {
            out.push(' ');
        }
        if token.kind == TokenKind::Param {
            out.push(':');
        }
        out.push_str(token.text);
    }
    out
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Returns the position just past the closing quote. A doubled quote inside
/// the literal is an escaped quote.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut pos = start + 1;

    while pos < bytes.len() {
        if bytes[pos] == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return Some(pos + 1);
        }
        pos += 1;
    }

    None
}
