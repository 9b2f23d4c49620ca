//! Combining two parsed expectation collections.

use crate::error::MergeError;
use crate::expectation::Expectation;
use crate::file::{ConflictResolution, ExpectationFile};
use crate::tags::{normalize_tag, TagSets};
use std::collections::BTreeSet;

/// Merge `b` into `a`.
///
/// Lines are keyed by test pattern and tag set. Under
/// [`ConflictResolution::Union`] matching lines are folded together; under
/// [`ConflictResolution::Override`] the line from `b` replaces the one from
/// `a`. Lines of `b` without a counterpart are appended. The result does
/// not share state with either input and is not conflict checked.
pub fn merge(
    a: &ExpectationFile,
    b: &ExpectationFile,
    mode: ConflictResolution,
) -> Result<ExpectationFile, MergeError> {
    let tag_sets = merge_tag_sets(&a.tag_sets, &b.tag_sets)?;

    let mut merged: Vec<Expectation> = a
        .expectations
        .iter()
        .cloned()
        .map(clear_position)
        .collect();

    for incoming in &b.expectations {
        let existing = merged
            .iter_mut()
            .find(|e| e.test == incoming.test && e.tags == incoming.tags);
        match (existing, mode) {
            (Some(existing), ConflictResolution::Union) => fold_union(existing, incoming),
            (Some(existing), ConflictResolution::Override) => {
                *existing = clear_position(incoming.clone());
            }
            (None, _) => merged.push(clear_position(incoming.clone())),
        }
    }

    let results = a.results.union(&b.results).copied().collect();
    let mut file = ExpectationFile::synthesize(
        merged,
        tag_sets,
        results,
        mode,
        a.conflicts_allowed || b.conflicts_allowed,
    );
    file.active_tags = a.active_tags.union(&b.active_tags).cloned().collect();
    tracing::debug!(
        expectations = file.expectations.len(),
        mode = %mode,
        "merged expectation files"
    );
    Ok(file)
}

fn clear_position(mut e: Expectation) -> Expectation {
    e.line_number = None;
    e.is_default_pass = false;
    e
}

fn fold_union(existing: &mut Expectation, incoming: &Expectation) {
    existing.add_results(incoming.results.iter().copied());
    existing.is_slow_test |= incoming.is_slow_test;
    existing.retry_on_failure |= incoming.retry_on_failure;

    for reason in &incoming.reason {
        if !existing.reason.contains(reason) {
            existing.reason.push(reason.clone());
        }
    }

    existing.trailing_comment = match (existing.trailing_comment.take(), &incoming.trailing_comment) {
        (Some(mine), Some(theirs)) => Some(format!("{}\n{}", mine, theirs)),
        (mine, theirs) => mine.or_else(|| theirs.clone()),
    };

    let known: BTreeSet<String> = existing.raw_tags.iter().map(|t| normalize_tag(t)).collect();
    for raw in &incoming.raw_tags {
        if !known.contains(&normalize_tag(raw)) {
            existing.raw_tags.push(raw.clone());
        }
    }

    let mut all_results = existing.all_results();
    all_results.extend(incoming.all_results());
    existing.raw_results = all_results
        .into_iter()
        .map(|r| r.as_str().to_string())
        .collect();
}

fn merge_tag_sets(a: &TagSets, b: &TagSets) -> Result<TagSets, MergeError> {
    let mut merged = a.clone();
    for set in b.iter() {
        let mut target: Option<usize> = None;
        for tag in &set.tags {
            let Some(index) = merged.set_index(tag) else {
                continue;
            };
            match target {
                Some(seen) if seen != index => {
                    return Err(MergeError::TagInMultipleSets { tag: tag.clone() });
                }
                _ => target = Some(index),
            }
        }
        match target {
            Some(index) => merged.extend_set(index, &set.raw_tags),
            None => merged
                .declare(set.raw_tags.clone(), set.line)
                .map_err(|tag| MergeError::TagInMultipleSets { tag })?,
        }
    }
    Ok(merged)
}
