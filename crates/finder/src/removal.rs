//! Removing expectations that are no longer needed.
//!
//! Lines are dropped unless a `finder:disable` annotation covers them or a
//! group they belong to would be left half removed. Comment blocks that
//! only described the removed lines go with them, and annotation blocks
//! left empty are swept away.

use crate::error::FinderError;
use crate::write::write_atomic;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tagex_core::annotation::parse_annotation;
use tagex_core::file::DisableScope;
use tagex_core::{
    parse_structure, Annotation, DisableCategory, Expectation, ExpectationFile, LineKind,
    ParseOptions,
};

/// Why expectations are being removed. Each kind can be suppressed by its
/// own `finder:disable-<kind>` annotation or by `finder:disable-general`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalType {
    Stale,
    Unused,
    Narrowing,
}

impl RemovalType {
    pub fn as_str(self) -> &'static str {
        match self {
            RemovalType::Stale => "stale",
            RemovalType::Unused => "unused",
            RemovalType::Narrowing => "narrowing",
        }
    }

    pub fn from_name(name: &str) -> Option<RemovalType> {
        match name {
            "stale" => Some(RemovalType::Stale),
            "unused" => Some(RemovalType::Unused),
            "narrowing" => Some(RemovalType::Narrowing),
            _ => None,
        }
    }

    pub fn category(self) -> DisableCategory {
        match self {
            RemovalType::Stale => DisableCategory::Stale,
            RemovalType::Unused => DisableCategory::Unused,
            RemovalType::Narrowing => DisableCategory::Narrowing,
        }
    }
}

impl fmt::Display for RemovalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested removal that was not carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuppressedRemoval {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RemovalOutcome {
    /// The rewritten text.
    #[serde(skip)]
    pub content: String,
    /// Bug reasons of the removed lines.
    pub removed_urls: BTreeSet<String>,
    /// Original line numbers of the removed expectation lines.
    pub removed_lines: Vec<usize>,
    pub suppressed: Vec<SuppressedRemoval>,
}

/// Remove `expectations` from the file at `path`, rewriting it only when
/// something changed.
pub fn remove_expectations_from_file(
    path: &Path,
    expectations: &[Expectation],
    removal_type: RemovalType,
) -> Result<RemovalOutcome, FinderError> {
    let content = std::fs::read_to_string(path).map_err(|e| FinderError::io(path, e))?;
    let outcome = remove_expectations_from_content(
        &content,
        expectations,
        removal_type,
        Some(&path.display().to_string()),
    )?;
    if outcome.content != content {
        write_atomic(path, &outcome.content)?;
    }
    Ok(outcome)
}

/// Remove `expectations` from `content`. Lines are matched by rule: same
/// pattern, tags, results and reason.
pub fn remove_expectations_from_content(
    content: &str,
    expectations: &[Expectation],
    removal_type: RemovalType,
    filename: Option<&str>,
) -> Result<RemovalOutcome, FinderError> {
    let mut options = ParseOptions::new();
    if let Some(name) = filename {
        options = options.filename(name);
    }
    let file = parse_structure(content, &options)?;
    let display_name = filename.unwrap_or("<memory>");

    let mut outcome = RemovalOutcome::default();
    let removable = select_removals(&file, expectations, removal_type, display_name, &mut outcome);

    let mut removed = vec![false; file.lines.len()];
    for &index in &removable {
        let e = &file.expectations[index];
        if let Some(number) = e.line_number {
            removed[number - 1] = true;
            outcome.removed_lines.push(number);
        }
        outcome.removed_urls.extend(e.reason.iter().cloned());
    }
    outcome.removed_lines.sort_unstable();

    scrub_comment_blocks(&file, &mut removed);
    sweep_empty_blocks(&file, &mut removed);

    let mut text = String::with_capacity(content.len());
    for (line, gone) in file.lines.iter().zip(&removed) {
        if !gone {
            text.push_str(&line.text);
            text.push_str(&line.ending);
        }
    }

    parse_structure(&text, &options).map_err(|e| FinderError::Annotation {
        path: PathBuf::from(display_name),
        message: e.to_string(),
    })?;

    tracing::debug!(
        file = display_name,
        removal_type = %removal_type,
        removed = outcome.removed_lines.len(),
        suppressed = outcome.suppressed.len(),
        "removed expectations"
    );
    outcome.content = text;
    Ok(outcome)
}

/// Indices of the expectations to drop, in file order. Suppressed
/// requests are logged and recorded in `outcome`.
fn select_removals(
    file: &ExpectationFile,
    requested: &[Expectation],
    removal_type: RemovalType,
    display_name: &str,
    outcome: &mut RemovalOutcome,
) -> Vec<usize> {
    let category = removal_type.category();
    let mut candidate = vec![false; file.expectations.len()];

    for (index, e) in file.expectations.iter().enumerate() {
        if !requested.iter().any(|r| r.same_rule(e)) {
            continue;
        }
        match file.annotations[index].suppressing(category) {
            Some(disable) => {
                let reason = match disable.scope {
                    DisableScope::Block => format!(
                        "inside a finder:disable-{} block opened on line {}",
                        disable.category, disable.line
                    ),
                    DisableScope::Inline => {
                        format!("carries an inline finder:disable-{}", disable.category)
                    }
                };
                suppress(outcome, display_name, e, reason, &disable.reason);
            }
            None => candidate[index] = true,
        }
    }

    let mut out = Vec::new();
    for (index, e) in file.expectations.iter().enumerate() {
        if !candidate[index] {
            continue;
        }
        if let Some(group) = &file.annotations[index].group {
            if file.group_members(group).any(|member| !candidate[member]) {
                let reason = format!("group '{}' has members that are not being removed", group);
                suppress(outcome, display_name, e, reason, "");
                continue;
            }
        }
        out.push(index);
    }
    out
}

fn suppress(
    outcome: &mut RemovalOutcome,
    display_name: &str,
    e: &Expectation,
    reason: String,
    annotation_reason: &str,
) {
    let line = e.line_number.unwrap_or(0);
    tracing::info!(
        file = display_name,
        line,
        reason = %reason,
        annotation_reason,
        "not removing {}",
        e.to_line()
    );
    let reason = if annotation_reason.is_empty() {
        reason
    } else {
        format!("{}: {}", reason, annotation_reason)
    };
    outcome.suppressed.push(SuppressedRemoval {
        line,
        text: e.to_line(),
        reason,
    });
}

fn annotation_at(file: &ExpectationFile, index: usize) -> Option<Annotation> {
    let line = &file.lines[index];
    if line.kind != LineKind::Annotation {
        return None;
    }
    parse_annotation(&line.text).ok().flatten()
}

/// Drop the comment block that introduced each run of removed lines.
///
/// Start annotations directly above a run go only together with the end
/// annotations directly below it. Plain comments go when the line after
/// the run is not another expectation, which would still need them.
fn scrub_comment_blocks(file: &ExpectationFile, removed: &mut [bool]) {
    let n = file.lines.len();
    let runs = removed_runs(removed);

    for (first, last) in runs {
        let mut ends = Vec::new();
        let mut j = last + 1;
        while j < n && !removed[j] {
            match annotation_at(file, j) {
                Some(a @ (Annotation::Enable { .. } | Annotation::GroupEnd)) => ends.push((j, a)),
                _ => break,
            }
            j += 1;
        }

        let mut matched = 0;
        let mut starts = Vec::new();
        let mut comments = Vec::new();
        let mut i = first;
        while i > file.header_end {
            i -= 1;
            if removed[i] {
                break;
            }
            match file.lines[i].kind {
                LineKind::Comment => comments.push(i),
                LineKind::Annotation => {
                    let closes = annotation_at(file, i).is_some_and(|start| {
                        start.is_start()
                            && ends
                                .get(matched)
                                .is_some_and(|(_, end)| start.is_closed_by(end))
                    });
                    if !closes {
                        break;
                    }
                    starts.push(i);
                    matched += 1;
                }
                LineKind::Blank | LineKind::Directive | LineKind::Expectation => break,
            }
        }

        for &index in starts.iter().chain(ends[..matched].iter().map(|(j, _)| j)) {
            removed[index] = true;
        }
        let next = last + 1 + matched;
        let still_described =
            next < n && !removed[next] && file.lines[next].kind == LineKind::Expectation;
        if !still_described {
            for index in comments {
                removed[index] = true;
            }
        }
    }
}

/// Maximal runs of removed lines as inclusive index pairs.
fn removed_runs(removed: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &gone) in removed.iter().enumerate() {
        match (gone, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, removed.len() - 1));
    }
    runs
}

/// Delete annotation blocks that enclose nothing but blanks and comments,
/// repeating until nested empty blocks are gone too.
fn sweep_empty_blocks(file: &ExpectationFile, removed: &mut [bool]) {
    loop {
        let mut changed = false;
        let mut open: Option<(usize, Annotation)> = None;
        for i in 0..file.lines.len() {
            if removed[i] {
                continue;
            }
            match file.lines[i].kind {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::Directive | LineKind::Expectation => open = None,
                LineKind::Annotation => match annotation_at(file, i) {
                    Some(a) if a.is_start() => open = Some((i, a)),
                    Some(end) => {
                        if let Some((start, a)) = open.take() {
                            if a.is_closed_by(&end) {
                                for gone in &mut removed[start..=i] {
                                    *gone = true;
                                }
                                changed = true;
                            }
                        }
                    }
                    None => open = None,
                },
            }
        }
        if !changed {
            break;
        }
    }
}

/// The first line of `content` holding `expectation`, with its 1-based
/// line number.
pub fn find_expectation_line(
    content: &str,
    expectation: &Expectation,
) -> Result<Option<(String, usize)>, FinderError> {
    let file = parse_structure(content, &ParseOptions::new())?;
    Ok(file
        .expectations
        .iter()
        .find(|e| e.same_rule(expectation))
        .and_then(|e| e.line_number)
        .map(|number| (file.lines[number - 1].text.clone(), number)))
}
