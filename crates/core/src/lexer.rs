//! Line-level lexer for expectation files.
//!
//! Expectation files are line oriented, so lexing yields one [`Line`] per
//! physical line, carrying its 1-based number, a coarse [`LineKind`], the
//! text without its terminator, and the terminator itself (`"\n"`,
//! `"\r\n"`, or `""` for a final unterminated line). Concatenating
//! `text + ending` over all lines reproduces the input exactly.

use serde::Serialize;

/// Header directive keys the parser understands.
pub const DIRECTIVE_KEYS: [&str; 4] = [
    "tags",
    "results",
    "conflicts_allowed",
    "conflict_resolution",
];

const ANNOTATION_PREFIX: &str = "finder:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Blank,
    /// A `#` comment that is neither a directive nor an annotation.
    Comment,
    /// `# key: value` where the key is a known directive, or where the
    /// value is bracketed.
    Directive,
    /// `# finder:...`
    Annotation,
    Expectation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub kind: LineKind,
    pub text: &'a str,
    pub ending: &'a str,
}

/// Iterator over the physical lines of a source text.
pub struct Lines<'a> {
    rest: &'a str,
    number: usize,
}

pub fn lines(src: &str) -> Lines<'_> {
    Lines {
        rest: src,
        number: 0,
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        self.number += 1;
        let (text, ending, rest) = match self.rest.find('\n') {
            Some(nl) => {
                let (text, ending) = if nl > 0 && self.rest.as_bytes()[nl - 1] == b'\r' {
                    (&self.rest[..nl - 1], &self.rest[nl - 1..=nl])
                } else {
                    (&self.rest[..nl], &self.rest[nl..=nl])
                };
                (text, ending, &self.rest[nl + 1..])
            }
            None => (self.rest, "", ""),
        };
        self.rest = rest;
        Some(Line {
            number: self.number,
            kind: classify(text),
            text,
            ending,
        })
    }
}

pub fn classify(text: &str) -> LineKind {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    let Some(body) = trimmed.strip_prefix('#') else {
        return LineKind::Expectation;
    };
    let body = body.trim_start();
    if body.starts_with(ANNOTATION_PREFIX) {
        return LineKind::Annotation;
    }
    if split_directive(text).is_some() {
        return LineKind::Directive;
    }
    LineKind::Comment
}

/// Split `# key: value` into `(key, value)`.
///
/// Only returns a pair for known keys, or for unknown keys whose value is
/// bracketed; an ordinary prose comment such as `# Note: flaky` is not a
/// directive.
pub fn split_directive(text: &str) -> Option<(&str, &str)> {
    let body = text.trim().strip_prefix('#')?.trim_start();
    let colon = body.find(':')?;
    let key = &body[..colon];
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return None;
    }
    let value = body[colon + 1..].trim();
    if DIRECTIVE_KEYS.contains(&key) || value.starts_with('[') {
        Some((key, value))
    } else {
        None
    }
}

/// Split an expectation line into its body and the raw trailing comment
/// (from the whitespace preceding the first `#` to the end of the line).
pub fn split_trailing_comment(text: &str) -> (&str, Option<&str>) {
    match text.find('#') {
        Some(hash) => {
            let body = text[..hash].trim_end();
            (body, Some(&text[body.len()..]))
        }
        None => (text.trim_end(), None),
    }
}
