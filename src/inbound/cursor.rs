//! Navigation over a flat token stream.
//!
//! Array elements have no explicit count in the stream, and a composite's
//! descendant count covers every nested token, not just its direct
//! children. Sibling boundaries are therefore found by byte position: the
//! next element starts at the first token whose offset lies beyond the end
//! of the current one.

use super::token::{Token, TokenKind};

/// Read-only cursor over the tokens of one document.
#[derive(Debug, Clone, Copy)]
pub struct TokenCursor<'a> {
    src: &'a [u8],
    tokens: &'a [Token],
}

impl<'a> TokenCursor<'a> {
    /// Wrap a source buffer and the tokens produced from it.
    pub fn new(src: &'a [u8], tokens: &'a [Token]) -> Self {
        Self { src, tokens }
    }

    /// Source text.
    #[inline]
    pub fn src(&self) -> &'a [u8] {
        self.src
    }

    /// Token at `index`.
    #[inline]
    pub fn token(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    /// Index of the token after `index` in document order, if not at the end.
    pub fn next_token(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        match self.tokens.get(next) {
            Some(token) if token.kind != TokenKind::Eof => Some(next),
            _ => None,
        }
    }

    /// Index of the first token after the subtree rooted at `index`.
    #[inline]
    pub fn skip_subtree(&self, index: usize) -> usize {
        let descendants = self.tokens.get(index).map_or(0, |t| t.descendants);
        index + 1 + descendants
    }

    /// Value token of `key` in the object at `object`.
    ///
    /// Only direct members are searched. Keys are compared byte for byte
    /// without unescaping. The first match wins.
    pub fn find_field(&self, object: usize, key: &str) -> Option<usize> {
        let obj = self.tokens.get(object)?;
        if obj.kind != TokenKind::Object {
            return None;
        }

        let end = object + 1 + obj.descendants;
        let mut index = object + 1;
        while index + 1 < end {
            let key_token = self.tokens.get(index)?;
            let value = index + 1;
            if key_token.kind == TokenKind::String && key_matches(key_token.raw(self.src), key) {
                return Some(value);
            }
            index = self.skip_subtree(value);
        }
        None
    }

    /// Iterate the direct elements of the array at `array`.
    ///
    /// Yields nothing if `array` is not an array.
    pub fn elements(&self, array: usize) -> ArrayElements<'a> {
        match self.tokens.get(array) {
            Some(token) if token.kind == TokenKind::Array => ArrayElements {
                tokens: self.tokens,
                next: array + 1,
                end_offset: token.end(),
            },
            _ => ArrayElements {
                tokens: self.tokens,
                next: self.tokens.len(),
                end_offset: 0,
            },
        }
    }
}

fn key_matches(raw: &[u8], key: &str) -> bool {
    raw.len() == key.len() + 2 && &raw[1..raw.len() - 1] == key.as_bytes()
}

/// Iterator over element token indices of one array.
#[derive(Debug, Clone)]
pub struct ArrayElements<'a> {
    tokens: &'a [Token],
    next: usize,
    end_offset: usize,
}

impl Iterator for ArrayElements<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next;
        let token = self.tokens.get(current)?;
        if token.kind == TokenKind::Eof || token.offset >= self.end_offset {
            return None;
        }

        let element_end = token.end();
        let mut sibling = current + 1;
        while let Some(t) = self.tokens.get(sibling) {
            if t.kind == TokenKind::Eof || t.offset >= element_end {
                break;
            }
            sibling += 1;
        }
        self.next = sibling;

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::token::tokenize;

    #[test]
    fn test_find_top_level_fields() {
        let src = br#"{"src":"a","nested":{"id":5},"id":7}"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        let id = cursor.find_field(0, "id").unwrap();
        assert_eq!(cursor.token(id).unwrap().u64_value(src), Some(7));

        let nested = cursor.find_field(0, "nested").unwrap();
        let inner = cursor.find_field(nested, "id").unwrap();
        assert_eq!(cursor.token(inner).unwrap().u64_value(src), Some(5));

        assert!(cursor.find_field(0, "missing").is_none());
        assert!(cursor.find_field(id, "id").is_none());
    }

    #[test]
    fn test_find_field_does_not_match_values() {
        let src = br#"{"a":"id","b":1}"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        assert!(cursor.find_field(0, "id").is_none());
        assert!(cursor.find_field(0, "b").is_some());
    }

    #[test]
    fn test_find_field_prefix_key() {
        let src = br#"{"identity":1,"id":2}"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        let id = cursor.find_field(0, "id").unwrap();
        assert_eq!(cursor.token(id).unwrap().u64_value(src), Some(2));
    }

    #[test]
    fn test_elements_of_nested_array() {
        let src = br#"[{"a":[1,2,{"b":[]}]},3,"x",[4,[5]],{}]"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        let raws: Vec<&[u8]> = cursor
            .elements(0)
            .map(|i| cursor.token(i).unwrap().raw(src))
            .collect();

        assert_eq!(
            raws,
            vec![
                &br#"{"a":[1,2,{"b":[]}]}"#[..],
                &b"3"[..],
                &br#""x""#[..],
                &b"[4,[5]]"[..],
                &b"{}"[..],
            ]
        );
    }

    #[test]
    fn test_elements_stop_at_array_end() {
        let src = br#"{"list":[1,2],"after":3}"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        let list = cursor.find_field(0, "list").unwrap();
        assert_eq!(cursor.elements(list).count(), 2);
    }

    #[test]
    fn test_elements_of_empty_and_non_array() {
        let src = br#"{"e":[],"n":5}"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        let e = cursor.find_field(0, "e").unwrap();
        let n = cursor.find_field(0, "n").unwrap();
        assert_eq!(cursor.elements(e).count(), 0);
        assert_eq!(cursor.elements(n).count(), 0);
        assert_eq!(cursor.elements(0).count(), 0);
    }

    #[test]
    fn test_next_token_and_skip_subtree() {
        let src = br#"[[1,2],3]"#;
        let tokens = tokenize(src).unwrap();
        let cursor = TokenCursor::new(src, &tokens);

        assert_eq!(cursor.next_token(0), Some(1));
        assert_eq!(cursor.skip_subtree(1), 4);
        assert_eq!(cursor.token(4).unwrap().raw(src), b"3");
        assert_eq!(cursor.next_token(4), None);
        assert_eq!(cursor.skip_subtree(0), 5);
    }
}
