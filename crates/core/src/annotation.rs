//! `# finder:` annotation comments.
//!
//! Annotations bracket expectation lines to suppress automated edits
//! (`disable-X` / `enable-X`) or to tie lines together into a named group
//! (`group-start <name>` / `group-end`). A disable may also trail a single
//! expectation line.

use serde::Serialize;
use std::fmt;

const PREFIX: &str = "finder:";

/// What kind of automated edit a disable annotation suppresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisableCategory {
    General,
    Stale,
    Unused,
    Narrowing,
}

impl DisableCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DisableCategory::General => "general",
            DisableCategory::Stale => "stale",
            DisableCategory::Unused => "unused",
            DisableCategory::Narrowing => "narrowing",
        }
    }

    pub fn from_name(name: &str) -> Option<DisableCategory> {
        match name {
            "general" => Some(DisableCategory::General),
            "stale" => Some(DisableCategory::Stale),
            "unused" => Some(DisableCategory::Unused),
            "narrowing" => Some(DisableCategory::Narrowing),
            _ => None,
        }
    }

    /// Whether a disable of this category blocks an edit of `edit`.
    pub fn suppresses(self, edit: DisableCategory) -> bool {
        self == DisableCategory::General || self == edit
    }
}

impl fmt::Display for DisableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Disable {
        category: DisableCategory,
        reason: String,
    },
    Enable {
        category: DisableCategory,
    },
    GroupStart {
        name: String,
    },
    GroupEnd,
}

impl Annotation {
    /// `disable-X` and `group-start` open a block.
    pub fn is_start(&self) -> bool {
        matches!(self, Annotation::Disable { .. } | Annotation::GroupStart { .. })
    }

    /// Whether `end` closes a block opened by `self`.
    pub fn is_closed_by(&self, end: &Annotation) -> bool {
        match (self, end) {
            (Annotation::Disable { category, .. }, Annotation::Enable { category: other }) => {
                category == other
            }
            (Annotation::GroupStart { .. }, Annotation::GroupEnd) => true,
            _ => false,
        }
    }
}

/// The text after `finder:` when `comment` is an annotation comment.
fn annotation_body(comment: &str) -> Option<&str> {
    comment
        .trim()
        .strip_prefix('#')?
        .trim_start()
        .strip_prefix(PREFIX)
}

/// Parse a full-line annotation comment.
///
/// Returns `Ok(None)` for comments that are not annotations at all, and an
/// error message for `finder:` comments this crate does not understand.
pub fn parse_annotation(comment: &str) -> Result<Option<Annotation>, String> {
    let Some(body) = annotation_body(comment) else {
        return Ok(None);
    };
    let (word, rest) = match body.find(char::is_whitespace) {
        Some(split) => (&body[..split], body[split..].trim()),
        None => (body.trim(), ""),
    };

    if let Some(name) = word.strip_prefix("disable-") {
        let category = DisableCategory::from_name(name)
            .ok_or_else(|| format!("unknown disable category '{}'", name))?;
        return Ok(Some(Annotation::Disable {
            category,
            reason: rest.to_string(),
        }));
    }
    if let Some(name) = word.strip_prefix("enable-") {
        let category = DisableCategory::from_name(name)
            .ok_or_else(|| format!("unknown enable category '{}'", name))?;
        return Ok(Some(Annotation::Enable { category }));
    }
    match word {
        "group-start" => Ok(Some(Annotation::GroupStart {
            name: rest.to_string(),
        })),
        "group-end" => Ok(Some(Annotation::GroupEnd)),
        other => Err(format!("unknown finder annotation '{}{}'", PREFIX, other)),
    }
}

/// Parse the trailing comment of an expectation line as an inline disable.
///
/// Only `disable-X` is meaningful inline; anything else is left alone as
/// ordinary comment text.
pub fn inline_disable(trailing_comment: &str) -> Option<(DisableCategory, String)> {
    match parse_annotation(trailing_comment) {
        Ok(Some(Annotation::Disable { category, reason })) => Some((category, reason)),
        _ => None,
    }
}

/// The free-text reason of a block or inline disable annotation.
///
/// Accepts a full expectation line, a trailing comment, or a standalone
/// annotation comment; returns `None` when no disable annotation is found.
pub fn disable_reason_from_comment(line: &str) -> Option<String> {
    let hash = line.find('#')?;
    inline_disable(&line[hash..]).map(|(_, reason)| reason)
}

/// The name of a `group-start` annotation. Names may contain spaces.
pub fn group_name_from_comment(line: &str) -> Option<String> {
    match parse_annotation(line) {
        Ok(Some(Annotation::GroupStart { name })) if !name.is_empty() => Some(name),
        _ => None,
    }
}
