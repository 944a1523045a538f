//! Extended JSON scanner.
//!
//! The scanner validates a whole document in a single pass and records the
//! byte span of every composite value it meets. In addition to the standard
//! JSON grammar it accepts call expressions wherever a value is expected:
//!
//! ```text
//! CallExpr ::= Identifier "(" [ Value ("," Value)* ] ")"
//! ```
//!
//! An identifier starts with an ASCII letter and continues with ASCII letters
//! or digits, and must be followed directly by `(` unless it is one of the
//! literals `true`, `false` or `null`. The scanner never consults an
//! [`Extension`](crate::Extension): unknown function names are syntactically
//! fine here and are rejected later, during decoding.
//!
//! # Example
//!
//! ```
//! use extjson::scanner::{scan, SiteKind};
//!
//! let index = scan(br#"{"v": Func2(1, [2])}"#).unwrap();
//! let call = index.calls().next().unwrap();
//! assert_eq!(call.span.start, 6);
//! assert_eq!(call.span.end, 19);
//! assert!(matches!(call.kind, SiteKind::Call { args: 2, .. }));
//! ```

use std::{borrow::Cow, ops::Range};

use crate::{Error, Result, cold_path, util::is_whitespace};

/// Maximum nesting of objects, arrays and call expressions.
pub const MAX_DEPTH: usize = 128;

/// Half-open byte range `[start, end)` of a value within the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub const fn range(self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns `true` if `other` lies entirely inside this span.
    pub const fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Syntactic shape of a recorded value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiteKind {
    /// `{ ... }`. `first_key` is the span of the first key literal, quotes included.
    Object {
        members: usize,
        first_key: Option<Span>,
    },
    /// `[ ... ]`
    Array { len: usize },
    /// `Name(arg, ...)`. `name` covers the identifier only.
    Call { name: Span, args: usize },
    /// A top-level string, number or literal.
    Scalar,
}

/// A value recorded by the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Site {
    pub span: Span,
    pub kind: SiteKind,
}

/// Spans of every composite value in a document, plus the top-level value,
/// ordered by start offset.
#[derive(Clone, Debug, Default)]
pub struct ScanIndex {
    sites: Vec<Site>,
}

impl ScanIndex {
    /// The top-level value.
    pub fn root(&self) -> Option<&Site> {
        self.sites.first()
    }

    /// The composite value beginning exactly at `start`, if any.
    pub fn site_at(&self, start: usize) -> Option<&Site> {
        self.sites
            .binary_search_by_key(&start, |site| site.span.start)
            .ok()
            .map(|index| &self.sites[index])
    }

    /// Every recorded value that starts inside `span`, `span`'s own site included.
    pub fn within(&self, span: Span) -> impl Iterator<Item = &Site> {
        let first = self.sites.partition_point(|site| site.span.start < span.start);
        self.sites[first..]
            .iter()
            .take_while(move |site| site.span.start < span.end)
    }

    /// Every call expression, outermost first.
    pub fn calls(&self) -> impl Iterator<Item = &Site> {
        self.sites
            .iter()
            .filter(|site| matches!(site.kind, SiteKind::Call { .. }))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Site> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Validate `input` as extended JSON and index its composite values.
///
/// # Errors
///
/// Returns [`Error::Syntax`] carrying the byte offset of the offending
/// character (or the input length on premature end), and
/// [`Error::RecursionLimitExceeded`] when nesting exceeds [`MAX_DEPTH`].
pub fn scan(input: &[u8]) -> Result<ScanIndex> {
    let text = std::str::from_utf8(input)
        .map_err(|error| Error::syntax(error.valid_up_to(), "invalid UTF-8 in input"))?;
    let mut scanner = Scanner {
        text,
        input,
        pos: 0,
        depth: 0,
        sites: Vec::new(),
    };
    scanner.skip_whitespace();
    let start = scanner.pos;
    scanner.scan_value()?;
    if scanner.sites.is_empty() {
        scanner.sites.push(Site {
            span: Span::new(start, scanner.pos),
            kind: SiteKind::Scalar,
        });
    }
    scanner.skip_whitespace();
    if scanner.pos != input.len() {
        return Err(scanner.error("after top-level value"));
    }
    Ok(ScanIndex {
        sites: scanner.sites,
    })
}

/// Reports whether `input` is valid extended JSON.
pub fn valid(input: &[u8]) -> bool {
    scan(input).is_ok()
}

struct Scanner<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
    depth: usize,
    sites: Vec<Site>,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, context: &str) -> Error {
        cold_path();
        match self.text.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(c) => Error::syntax(self.pos, format!("invalid character {c:?} {context}")),
            None => Error::syntax(self.pos, "unexpected end of JSON input"),
        }
    }

    fn enter(&mut self) -> Result<usize> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            cold_path();
            return Err(Error::RecursionLimitExceeded(MAX_DEPTH));
        }
        self.sites.push(Site {
            span: Span::new(self.pos, self.pos),
            kind: SiteKind::Scalar,
        });
        Ok(self.sites.len() - 1)
    }

    fn leave(&mut self, site: usize, kind: SiteKind) {
        self.depth -= 1;
        let site = &mut self.sites[site];
        site.span.end = self.pos;
        site.kind = kind;
    }

    fn scan_value(&mut self) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.scan_object(),
            Some(b'[') => self.scan_array(),
            Some(b'"') => self.scan_string().map(drop),
            Some(b'-' | b'0'..=b'9') => self.scan_number(),
            Some(c) if c.is_ascii_alphabetic() => self.scan_word(),
            _ => Err(self.error("looking for beginning of value")),
        }
    }

    fn scan_object(&mut self) -> Result<()> {
        let site = self.enter()?;
        self.pos += 1;
        let mut members = 0;
        let mut first_key = None;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                if self.peek() != Some(b'"') {
                    return Err(self.error("looking for beginning of object key string"));
                }
                let key = self.scan_string()?;
                if members == 0 {
                    first_key = Some(key);
                }
                members += 1;
                self.skip_whitespace();
                if self.peek() != Some(b':') {
                    return Err(self.error("after object key"));
                }
                self.pos += 1;
                self.scan_value()?;
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b'}') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("after object key:value pair")),
                }
            }
        }
        self.leave(site, SiteKind::Object { members, first_key });
        Ok(())
    }

    fn scan_array(&mut self) -> Result<()> {
        let site = self.enter()?;
        self.pos += 1;
        let mut len = 0;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                self.scan_value()?;
                len += 1;
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b']') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("after array element")),
                }
            }
        }
        self.leave(site, SiteKind::Array { len });
        Ok(())
    }

    // Literal or the identifier of a call expression.
    fn scan_word(&mut self) -> Result<()> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let name = Span::new(start, self.pos);
        if self.peek() == Some(b'(') {
            self.pos = start;
            return self.scan_call(name);
        }
        match &self.input[name.range()] {
            b"true" | b"false" | b"null" => Ok(()),
            _ => Err(self.error(&format!("after name {}", &self.text[name.range()]))),
        }
    }

    fn scan_call(&mut self, name: Span) -> Result<()> {
        let site = self.enter()?;
        self.pos = name.end + 1;
        let mut args = 0;
        self.skip_whitespace();
        if self.peek() == Some(b')') {
            self.pos += 1;
        } else {
            loop {
                self.scan_value()?;
                args += 1;
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        self.skip_whitespace();
                        if self.peek() == Some(b')') {
                            return Err(self.error("after comma in function call"));
                        }
                    }
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("after function argument")),
                }
            }
        }
        self.leave(site, SiteKind::Call { name, args });
        Ok(())
    }

    fn scan_string(&mut self) -> Result<Span> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(Span::new(start, self.pos));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                            self.pos += 1
                        }
                        Some(b'u') => {
                            self.pos += 1;
                            for _ in 0..4 {
                                if !matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                                    return Err(
                                        self.error("in \\u hexadecimal character escape")
                                    );
                                }
                                self.pos += 1;
                            }
                        }
                        _ => return Err(self.error("in string escape code")),
                    }
                }
                None => return Err(self.error("in string literal")),
                Some(c) if c < 0x20 => return Err(self.error("in string literal")),
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    fn scan_number(&mut self) -> Result<()> {
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.scan_digits(),
            _ => return Err(self.error("in numeric literal")),
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("after decimal point in numeric literal"));
            }
            self.scan_digits();
        }
        if let Some(b'e' | b'E') = self.peek() {
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("in exponent of numeric literal"));
            }
            self.scan_digits();
        }
        Ok(())
    }
}

/// Returns the offset one past the closing quote of the validated string
/// literal opening at `start`.
pub(crate) fn string_end(input: &[u8], start: usize) -> Result<usize> {
    let mut pos = start + 1;
    while let Some(&c) = input.get(pos) {
        match c {
            b'"' => return Ok(pos + 1),
            b'\\' => pos += 2,
            _ => pos += 1,
        }
    }
    cold_path();
    Err(Error::syntax(input.len(), "unexpected end of JSON input"))
}

/// Decodes a validated string literal, quotes included. Escape-free strings
/// are borrowed from the input. Unpaired surrogates decode to U+FFFD.
pub(crate) fn unescape(literal: &str, offset: usize) -> Result<Cow<'_, str>> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| Error::syntax(offset, "expected string literal"))?;
    if !inner.contains('\\') {
        return Ok(Cow::Borrowed(inner));
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let unit = read_hex4(&mut chars, offset)?;
                let decoded = if (0xD800..0xDC00).contains(&unit) {
                    let rest = chars.as_str();
                    match rest.strip_prefix("\\u") {
                        Some(tail) => {
                            let mut lookahead = tail.chars();
                            let low = read_hex4(&mut lookahead, offset)?;
                            if (0xDC00..0xE000).contains(&low) {
                                chars = lookahead;
                                char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00))
                            } else {
                                None
                            }
                        }
                        None => None,
                    }
                } else {
                    char::from_u32(unit)
                };
                out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            _ => {
                cold_path();
                return Err(Error::syntax(offset, "invalid escape in string literal"));
            }
        }
    }
    Ok(Cow::Owned(out))
}

fn read_hex4(chars: &mut std::str::Chars<'_>, offset: usize) -> Result<u32> {
    let mut unit = 0;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| Error::syntax(offset, "invalid \\u escape in string literal"))?;
        unit = unit * 16 + digit;
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_borrows_plain_strings() {
        assert!(matches!(unescape(r#""plain""#, 0), Ok(Cow::Borrowed("plain"))));
    }

    #[test]
    fn unescape_surrogate_pairs() {
        let decoded = unescape(r#""\ud83d\ude00 \ud800x""#, 0).unwrap();
        assert_eq!(decoded, "\u{1F600} \u{FFFD}x");
    }

    #[test]
    fn string_end_skips_escaped_quotes() {
        let input = br#""a\"b" tail"#;
        assert_eq!(string_end(input, 0).unwrap(), 6);
    }
}
