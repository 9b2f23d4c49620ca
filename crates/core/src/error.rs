use serde::{Deserialize, Serialize};
use std::fmt;

/// A structural problem in an expectation file, located by 1-based line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
pub struct ParseError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(file: Option<&str>, line: usize, message: impl Into<String>) -> Self {
        ParseError {
            file: file.map(str::to_owned),
            line,
            message: message.into(),
        }
    }

    /// Serialize to a JSON object that always carries every field.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "file":    self.file,
            "line":    self.line,
            "message": self.message,
        })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}: {}", file, self.line, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}

/// Every pair of conflicting lines found for one test pattern.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PatternConflicts {
    /// The pattern as written in the file.
    pub pattern: String,
    /// `(earlier, later)` line numbers, in file order.
    pub pairs: Vec<(usize, usize)>,
}

/// Overlapping expectations exist and the file does not allow conflicts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, thiserror::Error)]
pub struct ConflictError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub conflicts: Vec<PatternConflicts>,
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for group in &self.conflicts {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "Found conflicts for pattern {}", group.pattern)?;
            if let Some(file) = &self.file {
                write!(f, " in {}", file)?;
            }
            write!(f, ":")?;
            for (a, b) in &group.pairs {
                write!(f, "\n  line {} conflicts with line {}", a, b)?;
            }
        }
        Ok(())
    }
}

/// The caller supplied active tags that no tag set declares.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, thiserror::Error)]
pub struct UnknownTagError {
    /// Sorted and deduplicated.
    pub tags: Vec<String>,
}

impl fmt::Display for UnknownTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tags.as_slice() {
            [] => write!(f, "no unknown tags"),
            [only] => write!(
                f,
                "Tag {} is not declared in the expectations file and has not been \
                 explicitly ignored. There may have been a typo in the expectations \
                 file. Please make sure the aforementioned tag is declared at the top \
                 of the expectations file.",
                only
            ),
            [init @ .., last] => write!(
                f,
                "Tags {} and {} are not declared in the expectations file and have not \
                 been explicitly ignored. There may have been a typo in the expectations \
                 file. Please make sure the aforementioned tags are declared at the top \
                 of the expectations file.",
                init.join(", "),
                last
            ),
        }
    }
}

/// Two collections cannot be merged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("tag '{tag}' is declared in different tag sets across the merged files")]
    TagInMultipleSets { tag: String },
}

/// Everything `parse` can fail with.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExpectationsError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    UnknownTag(#[from] UnknownTagError),
}

impl ExpectationsError {
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            ExpectationsError::Parse(e) => e.to_json_value(),
            ExpectationsError::Conflict(e) => serde_json::json!({
                "file": e.file,
                "conflicts": e.conflicts,
                "message": e.to_string(),
            }),
            ExpectationsError::UnknownTag(e) => serde_json::json!({
                "tags": e.tags,
                "message": e.to_string(),
            }),
        }
    }
}
