//! Flat JSON token stream.
//!
//! The tokenizer walks the text once and records every value as a
//! [`Token`] in depth-first order. Nothing is copied and no tree is built:
//! a token is a byte range into the source plus, for objects and arrays,
//! the number of tokens nested inside it.
//!
//! ```text
//! {"id":1,"tags":["a"]}
//!
//! #0 Object  0..21  desc=5
//! #1 String  1..5   "id"
//! #2 Number  6..7   1
//! #3 String  8..14  "tags"
//! #4 Array  15..20  desc=1
//! #5 String 16..19  "a"
//! #6 Eof    21..21
//! ```
//!
//! Object keys are string tokens that immediately precede their value.
//! String tokens include their quotes. The stream always ends with an
//! [`TokenKind::Eof`] token.

use crate::error::{ClubbyError, Result};

/// Maximum nesting of objects and arrays.
pub const MAX_DEPTH: usize = 64;

/// Kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
    /// `"..."`, quotes included in the range.
    String,
    /// Any JSON number.
    Number,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// End of the stream.
    Eof,
}

/// A view of one JSON value inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Value kind.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
    /// Number of tokens nested inside (0 for scalars).
    pub descendants: usize,
}

impl Token {
    /// Offset one past the last byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The bytes this token covers.
    #[inline]
    pub fn raw<'a>(&self, src: &'a [u8]) -> &'a [u8] {
        &src[self.offset..self.end()]
    }

    /// Unescaped value of a string token.
    pub fn string_value(&self, src: &[u8]) -> Option<String> {
        if self.kind != TokenKind::String {
            return None;
        }
        serde_json::from_slice(self.raw(src)).ok()
    }

    /// Value of a number token as `u64`.
    ///
    /// Any JSON number is accepted. Fractions are truncated toward zero and
    /// out-of-range values saturate, so `-3` reads as 0.
    pub fn u64_value(&self, src: &[u8]) -> Option<u64> {
        let text = self.number_text(src)?;
        text.parse()
            .ok()
            .or_else(|| text.parse::<f64>().ok().map(|f| f as u64))
    }

    /// Value of a number token as `i64`, truncated and saturated like
    /// [`u64_value`](Self::u64_value).
    pub fn i64_value(&self, src: &[u8]) -> Option<i64> {
        let text = self.number_text(src)?;
        text.parse()
            .ok()
            .or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
    }

    fn number_text<'a>(&self, src: &'a [u8]) -> Option<&'a str> {
        if self.kind != TokenKind::Number {
            return None;
        }
        std::str::from_utf8(self.raw(src)).ok()
    }
}

/// Tokenize a complete JSON document.
///
/// # Errors
///
/// Returns [`ClubbyError::MalformedFrame`] if the text is not exactly one
/// valid JSON value (surrounding whitespace allowed).
pub fn tokenize(src: &[u8]) -> Result<Vec<Token>> {
    let mut scanner = Scanner {
        src,
        pos: 0,
        tokens: Vec::new(),
    };

    scanner.skip_ws();
    scanner.value(0)?;
    scanner.skip_ws();
    if scanner.pos != src.len() {
        return Err(scanner.error("trailing characters"));
    }

    scanner.tokens.push(Token {
        kind: TokenKind::Eof,
        offset: src.len(),
        len: 0,
        descendants: 0,
    });
    Ok(scanner.tokens)
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> ClubbyError {
        ClubbyError::MalformedFrame(format!("{} at byte {}", what, self.pos))
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() != Some(byte) {
            return Err(self.error(&format!("expected '{}'", byte as char)));
        }
        self.pos += 1;
        Ok(())
    }

    fn push_scalar(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            offset: start,
            len: self.pos - start,
            descendants: 0,
        });
    }

    fn value(&mut self, depth: usize) -> Result<()> {
        match self.peek() {
            Some(b'{') => self.composite(TokenKind::Object, depth),
            Some(b'[') => self.composite(TokenKind::Array, depth),
            Some(b'"') => self.string(),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b't') => self.literal(b"true", TokenKind::True),
            Some(b'f') => self.literal(b"false", TokenKind::False),
            Some(b'n') => self.literal(b"null", TokenKind::Null),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn composite(&mut self, kind: TokenKind, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        let index = self.tokens.len();
        let start = self.pos;
        let close = if kind == TokenKind::Object { b'}' } else { b']' };
        self.tokens.push(Token {
            kind,
            offset: start,
            len: 0,
            descendants: 0,
        });

        self.pos += 1;
        self.skip_ws();
        if self.peek() == Some(close) {
            self.pos += 1;
        } else {
            loop {
                self.skip_ws();
                if kind == TokenKind::Object {
                    if self.peek() != Some(b'"') {
                        return Err(self.error("expected object key"));
                    }
                    self.string()?;
                    self.skip_ws();
                    self.expect(b':')?;
                    self.skip_ws();
                }
                self.value(depth + 1)?;
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(c) if c == close => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("expected ',' or closing bracket")),
                }
            }
        }

        let descendants = self.tokens.len() - index - 1;
        let token = &mut self.tokens[index];
        token.len = self.pos - start;
        token.descendants = descendants;
        Ok(())
    }

    fn string(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                            self.pos += 1
                        }
                        Some(b'u') => {
                            let hex = self.src.get(self.pos + 1..self.pos + 5);
                            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                                return Err(self.error("bad unicode escape"));
                            }
                            self.pos += 5;
                        }
                        _ => return Err(self.error("bad escape")),
                    }
                }
                Some(c) if c < 0x20 => return Err(self.error("control character in string")),
                Some(_) => self.pos += 1,
                None => return Err(self.error("unterminated string")),
            }
        }
        self.push_scalar(TokenKind::String, start);
        Ok(())
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn number(&mut self) -> Result<()> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => {
                self.digits();
            }
            _ => return Err(self.error("bad number")),
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.digits() == 0 {
                return Err(self.error("bad fraction"));
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(self.error("bad exponent"));
            }
        }
        self.push_scalar(TokenKind::Number, start);
        Ok(())
    }

    fn literal(&mut self, word: &[u8], kind: TokenKind) -> Result<()> {
        let start = self.pos;
        if !self.src[start..].starts_with(word) {
            return Err(self.error("bad literal"));
        }
        self.pos += word.len();
        self.push_scalar(kind, start);
        Ok(())
    }
}
