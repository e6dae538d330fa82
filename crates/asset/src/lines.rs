//! Whitespace tokenizer shared by OBJ and MTL text.
//!
//! A document is kept as a list of non-empty lines, each a list of
//! tokens. Token 0 is the directive keyword (`v`, `f`, `newmtl`, ...).

/// One tokenized, non-empty source line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Line {
    tokens: Vec<String>,
}

impl Line {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// Directive keyword of this line.
    #[inline]
    pub fn directive(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }

    #[inline]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Arguments after the directive.
    #[inline]
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens from `index` on, joined by single spaces. Names and paths may
    /// contain whitespace, which the splitter has already collapsed.
    pub fn remaining(&self, index: usize) -> String {
        self.tokens.get(index..).map(|t| t.join(" ")).unwrap_or_default()
    }

    /// Lenient float at token `index` (0 when missing or malformed).
    #[inline]
    pub fn float(&self, index: usize) -> f32 {
        self.tokens.get(index).map(|t| parse_float(t)).unwrap_or(0.0)
    }
}

/// Ordered, immutable list of lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Line>,
}

impl Document {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Lines that start with `directive`, with their index in the document.
    pub fn directives<'a>(
        &'a self,
        directive: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Line)> + 'a {
        self.lines
            .iter()
            .enumerate()
            .filter(move |(_, line)| line.directive() == directive)
    }

    /// Append the lines of `other` (several `mtllib` files share one
    /// material document).
    pub fn extend(&mut self, other: Document) {
        self.lines.extend(other.lines);
    }
}

impl From<Vec<Line>> for Document {
    fn from(lines: Vec<Line>) -> Self {
        Self { lines }
    }
}

/// Split a raw buffer into lines of whitespace separated tokens.
///
/// Space and tab end a token, CR and LF additionally end the line. Empty
/// lines are dropped. There is no quoting or escaping.
pub fn split_lines(bytes: &[u8]) -> Document {
    let mut lines = Vec::new();
    let mut line: Vec<String> = Vec::new();
    let mut token: Vec<u8> = Vec::new();

    let flush_token = |token: &mut Vec<u8>, line: &mut Vec<String>| {
        if !token.is_empty() {
            line.push(String::from_utf8_lossy(token).into_owned());
            token.clear();
        }
    };

    for &byte in bytes {
        match byte {
            b' ' | b'\t' => flush_token(&mut token, &mut line),
            b'\r' | b'\n' => {
                flush_token(&mut token, &mut line);
                if !line.is_empty() {
                    lines.push(Line::new(std::mem::take(&mut line)));
                }
            }
            other => token.push(other),
        }
    }

    flush_token(&mut token, &mut line);
    if !line.is_empty() {
        lines.push(Line::new(line));
    }

    Document::from(lines)
}

/// Locale independent float parse that never fails: the longest numeric
/// prefix wins, anything unparsable is 0.
pub fn parse_float(token: &str) -> f32 {
    if let Ok(value) = token.parse::<f32>() {
        return value;
    }
    let prefix_len = token
        .bytes()
        .take_while(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    (1..=prefix_len)
        .rev()
        .find_map(|n| token[..n].parse::<f32>().ok())
        .unwrap_or(0.0)
}

/// Parse a 1-based OBJ index into a 0-based one.
///
/// Only the leading integer is read. Zero, negative (relative) and
/// unparsable indices come back as `None`.
pub fn parse_index(token: &str) -> Option<u32> {
    let bytes = token.as_bytes();
    let sign_len = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = bytes[sign_len..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    let raw = token[..sign_len + digits].parse::<i64>().ok()?;
    if raw < 1 {
        return None;
    }
    u32::try_from(raw - 1).ok()
}
