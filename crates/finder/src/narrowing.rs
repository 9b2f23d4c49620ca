//! Narrowing the scope of semi-stale expectations.
//!
//! An expectation is semi-stale when it is still needed on some of the
//! configurations it covers and not on others. Its tags are replaced with
//! the smallest tag sets that cover every failing configuration without
//! covering a passing one.

use crate::error::{FinderError, NarrowingError};
use crate::write::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tagex_core::tags::normalize_tag;
use tagex_core::{parse_structure, DisableCategory, Expectation, ExpectationFile, ParseOptions};

type TagSet = BTreeSet<String>;

/// Build results of one step (a builder running a test suite).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Distinct tag sets reported by the step's builds.
    pub tag_sets: Vec<TagSet>,
    #[serde(default)]
    pub passed_builds: usize,
    #[serde(default)]
    pub failed_builds: usize,
}

impl BuildStats {
    /// Whether the expectation was needed: some build failed.
    pub fn needed(&self) -> bool {
        self.failed_builds > 0
    }
}

/// An expectation together with the build results of every step it
/// applied to, keyed by step name.
#[derive(Debug, Clone, Serialize)]
pub struct SemiStaleExpectation {
    pub expectation: Expectation,
    pub steps: BTreeMap<String, BuildStats>,
}

/// Caller knowledge about tags that always appear together.
pub trait TagConsolidator {
    fn consolidate(&self, tags: TagSet) -> TagSet;
}

/// Leaves tags untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConsolidation;

impl TagConsolidator for NoConsolidation {
    fn consolidate(&self, tags: TagSet) -> TagSet {
        tags
    }
}

/// When both tags are present, `drop` is redundant next to `keep`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRule {
    pub keep: String,
    pub drop: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapRules(pub Vec<OverlapRule>);

impl TagConsolidator for OverlapRules {
    fn consolidate(&self, mut tags: TagSet) -> TagSet {
        for rule in &self.0 {
            let keep = normalize_tag(&rule.keep);
            let drop = normalize_tag(&rule.drop);
            if tags.contains(&keep) && tags.contains(&drop) {
                tags.remove(&drop);
            }
        }
        tags
    }
}

/// An expectation left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNarrowing {
    pub line: Option<usize>,
    pub expectation: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NarrowingOutcome {
    #[serde(skip)]
    pub content: String,
    /// Bug reasons of the rewritten expectations.
    pub touched_urls: BTreeSet<String>,
    pub skipped: Vec<SkippedNarrowing>,
}

/// Narrow every expectation in `semi_stale` within the file at `path`,
/// rewriting it only when something changed.
pub fn narrow_semi_stale_scope(
    path: &Path,
    semi_stale: &[SemiStaleExpectation],
    consolidator: &dyn TagConsolidator,
) -> Result<NarrowingOutcome, FinderError> {
    let content = std::fs::read_to_string(path).map_err(|e| FinderError::io(path, e))?;
    let outcome = narrow_semi_stale_scope_in_content(
        &content,
        semi_stale,
        consolidator,
        Some(&path.display().to_string()),
    )?;
    if outcome.content != content {
        write_atomic(path, &outcome.content)?;
    }
    Ok(outcome)
}

/// Narrow every expectation in `semi_stale` within `content`.
///
/// Each original line is replaced in place by one line per narrowed tag
/// set, sorted. Expectations that cannot be narrowed are reported in
/// [`NarrowingOutcome::skipped`] and left alone.
pub fn narrow_semi_stale_scope_in_content(
    content: &str,
    semi_stale: &[SemiStaleExpectation],
    consolidator: &dyn TagConsolidator,
    filename: Option<&str>,
) -> Result<NarrowingOutcome, FinderError> {
    let mut options = ParseOptions::new();
    if let Some(name) = filename {
        options = options.filename(name);
    }
    let display_name = filename.unwrap_or("<memory>");
    let mut outcome = NarrowingOutcome {
        content: content.to_string(),
        ..Default::default()
    };

    for item in semi_stale {
        let file = parse_structure(&outcome.content, &options)?;
        let Some(index) = file
            .expectations
            .iter()
            .position(|e| e.same_rule(&item.expectation))
        else {
            skip(&mut outcome, display_name, &item.expectation, "not found in the file".to_string());
            continue;
        };
        let found = &file.expectations[index];

        if let Some(disable) = file.annotations[index].suppressing(DisableCategory::Narrowing) {
            let reason = format!("narrowing disabled by finder:disable-{}", disable.category);
            tracing::info!(
                file = display_name,
                line = found.line_number.unwrap_or(0),
                annotation_reason = %disable.reason,
                "{}",
                reason
            );
            outcome.skipped.push(SkippedNarrowing {
                line: found.line_number,
                expectation: found.to_line(),
                reason,
            });
            continue;
        }

        let replacements = match narrowed_lines(&file, found, &item.steps, consolidator) {
            Ok(Some(lines)) => lines,
            Ok(None) => continue,
            Err(e) => {
                skip(&mut outcome, display_name, found, e.to_string());
                continue;
            }
        };
        if let Some(number) = found.line_number {
            outcome.content = replace_line(&file, number, &replacements);
            outcome.touched_urls.extend(found.reason.iter().cloned());
            tracing::debug!(
                file = display_name,
                line = number,
                replacements = replacements.len(),
                "narrowed expectation"
            );
        }
    }
    Ok(outcome)
}

fn skip(outcome: &mut NarrowingOutcome, display_name: &str, e: &Expectation, reason: String) {
    tracing::warn!(
        file = display_name,
        line = e.line_number.unwrap_or(0),
        reason = %reason,
        "not narrowing {}",
        e.to_line()
    );
    outcome.skipped.push(SkippedNarrowing {
        line: e.line_number,
        expectation: e.to_line(),
        reason,
    });
}

/// Replacement lines for `expectation`, or `None` when its scope stays the
/// same.
fn narrowed_lines(
    file: &ExpectationFile,
    expectation: &Expectation,
    steps: &BTreeMap<String, BuildStats>,
    consolidator: &dyn TagConsolidator,
) -> Result<Option<Vec<String>>, NarrowingError> {
    let mut passing: BTreeSet<TagSet> = BTreeSet::new();
    let mut failing: BTreeSet<TagSet> = BTreeSet::new();
    for (name, stats) in steps {
        let [tags] = stats.tag_sets.as_slice() else {
            return Err(NarrowingError::MultipleTagSets {
                step: name.clone(),
                count: stats.tag_sets.len(),
            });
        };
        let tags: TagSet = tags.iter().map(|t| normalize_tag(t)).collect();
        if stats.needed() {
            failing.insert(tags);
        } else {
            passing.insert(tags);
        }
    }
    if passing.is_empty() || failing.is_empty() {
        return Ok(None);
    }

    let mut narrowed = BTreeSet::new();
    for tags in narrowed_tag_sets(&expectation.tags, &passing, &failing)? {
        let tags = consolidator.consolidate(tags);
        let tags = if file.tag_sets.is_empty() {
            tags
        } else {
            file.tag_sets
                .most_specific(&tags)
                .map_err(|tag| NarrowingError::UndeclaredTag { tag })?
        };
        narrowed.insert(tags);
    }
    if narrowed.len() == 1 && narrowed.contains(&expectation.tags) {
        return Ok(None);
    }

    let mut lines: Vec<String> = narrowed
        .into_iter()
        .map(|tags| {
            let mut e = expectation.clone();
            e.raw_tags = tags.iter().cloned().collect();
            e.tags = tags;
            e.to_line()
        })
        .collect();
    lines.sort();
    lines.dedup();
    Ok(Some(lines))
}

/// The tag sets that cover every failing configuration and no passing one.
///
/// Tags shared by every configuration, other than the expectation's own,
/// carry no information and are dropped first. Each result includes
/// `own_tags`.
pub fn narrowed_tag_sets(
    own_tags: &TagSet,
    passing: &BTreeSet<TagSet>,
    failing: &BTreeSet<TagSet>,
) -> Result<Vec<TagSet>, NarrowingError> {
    let mut all = passing.iter().chain(failing);
    let mut common = all.next().cloned().unwrap_or_default();
    for set in all {
        common.retain(|t| set.contains(t));
    }
    common.retain(|t| !own_tags.contains(t));
    let strip = |set: &TagSet| -> TagSet { set.difference(&common).cloned().collect() };
    let passing: Vec<TagSet> = passing.iter().map(strip).collect();
    let failing: Vec<TagSet> = failing
        .iter()
        .map(strip)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    for fail in &failing {
        if let Some(pass) = passing.iter().find(|p| fail.is_subset(p)) {
            return Err(NarrowingError::PassingSupersetOfFailing {
                failing: fail.iter().cloned().collect(),
                passing: pass.iter().cloned().collect(),
            });
        }
    }

    let mut covered = vec![false; failing.len()];
    let mut accepted: Vec<TagSet> = Vec::new();
    for i in 0..failing.len() {
        if covered[i] {
            continue;
        }
        let mut candidate = failing[i].clone();
        loop {
            let mut shrunk = false;
            for (j, other) in failing.iter().enumerate() {
                if j == i || covered[j] {
                    continue;
                }
                let intersection: TagSet = candidate.intersection(other).cloned().collect();
                if intersection == candidate {
                    continue;
                }
                let hits_passing = passing.iter().any(|p| intersection.is_subset(p));
                let claims_covered = failing.iter().any(|f| {
                    intersection.is_subset(f) && accepted.iter().any(|a| a.is_subset(f))
                });
                if !hits_passing && !claims_covered {
                    candidate = intersection;
                    shrunk = true;
                }
            }
            if !shrunk {
                break;
            }
        }
        for (j, fail) in failing.iter().enumerate() {
            if candidate.is_subset(fail) {
                covered[j] = true;
            }
        }
        accepted.push(candidate);
    }

    Ok(accepted
        .into_iter()
        .map(|mut set| {
            set.extend(own_tags.iter().cloned());
            set
        })
        .collect())
}

/// `file`'s source with line `number` replaced by `replacements`, each
/// terminated like the original line.
fn replace_line(file: &ExpectationFile, number: usize, replacements: &[String]) -> String {
    let mut out = String::new();
    for line in &file.lines {
        if line.number != number {
            out.push_str(&line.text);
            out.push_str(&line.ending);
            continue;
        }
        let separator = if line.ending.is_empty() { "\n" } else { line.ending.as_str() };
        for (k, text) in replacements.iter().enumerate() {
            out.push_str(text);
            if k + 1 < replacements.len() {
                out.push_str(separator);
            } else {
                out.push_str(&line.ending);
            }
        }
    }
    out
}
