//! Conflict detection between expectation lines.
//!
//! Two lines conflict when their patterns can match a common test name
//! (identical text, a glob covering an exact name, or nested globs) and some
//! configuration could activate both. Lines are kept apart when one
//! carries a tag that excludes a tag of the other, either because both tags
//! are declared in one tag set or because the caller's `tags_conflict`
//! predicate says so.

use crate::error::{ConflictError, PatternConflicts};
use crate::expectation::Expectation;
use crate::file::ExpectationFile;
use crate::tags::TagSets;

pub type TagsConflict<'a> = Option<&'a dyn Fn(&str, &str) -> bool>;

/// Whether no single configuration can activate both lines.
pub fn mutually_exclusive(
    a: &Expectation,
    b: &Expectation,
    tag_sets: &TagSets,
    tags_conflict: TagsConflict<'_>,
) -> bool {
    a.tags.iter().any(|ta| {
        b.tags.iter().any(|tb| {
            tag_sets.mutually_exclusive(ta, tb)
                || tags_conflict.is_some_and(|f| f(ta, tb) || f(tb, ta))
        })
    })
}

/// Every conflicting pair, grouped under the pattern of the earlier line in
/// order of first appearance.
pub fn find_conflicts(file: &ExpectationFile, tags_conflict: TagsConflict<'_>) -> Vec<PatternConflicts> {
    let mut out: Vec<PatternConflicts> = Vec::new();
    for (i, a) in file.expectations.iter().enumerate() {
        for b in &file.expectations[i + 1..] {
            if !a.test.overlaps(&b.test) || mutually_exclusive(a, b, &file.tag_sets, tags_conflict) {
                continue;
            }
            let pair = (a.line_number.unwrap_or(0), b.line_number.unwrap_or(0));
            let pattern = a.test.encode();
            match out.iter_mut().find(|g| g.pattern == pattern) {
                Some(group) => group.pairs.push(pair),
                None => out.push(PatternConflicts {
                    pattern,
                    pairs: vec![pair],
                }),
            }
        }
    }
    out
}

/// Fail with every conflict found.
pub fn check_conflicts(file: &ExpectationFile, tags_conflict: TagsConflict<'_>) -> Result<(), ConflictError> {
    let conflicts = find_conflicts(file, tags_conflict);
    if conflicts.is_empty() {
        return Ok(());
    }
    tracing::debug!(
        file = file.filename.as_deref().unwrap_or("<memory>"),
        patterns = conflicts.len(),
        "conflicting expectations"
    );
    Err(ConflictError {
        file: file.filename.clone(),
        conflicts,
    })
}
