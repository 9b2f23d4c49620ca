//! A parsed expectation file.

use crate::annotation::DisableCategory;
use crate::error::UnknownTagError;
use crate::expectation::Expectation;
use crate::lexer::LineKind;
use crate::result::ResultKind;
use crate::tags::{normalize_tag, TagSets};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How lines applying to the same test combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictResolution {
    #[default]
    Union,
    Override,
}

impl ConflictResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictResolution::Union => "UNION",
            ConflictResolution::Override => "OVERRIDE",
        }
    }

    /// Case-insensitive.
    pub fn from_name(name: &str) -> Option<ConflictResolution> {
        if name.eq_ignore_ascii_case("union") {
            Some(ConflictResolution::Union)
        } else if name.eq_ignore_ascii_case("override") {
            Some(ConflictResolution::Override)
        } else {
            None
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical line of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    pub number: usize,
    pub kind: LineKind,
    pub text: String,
    /// `"\n"`, `"\r\n"`, or empty on an unterminated last line.
    pub ending: String,
    /// Index into [`ExpectationFile::expectations`] for expectation lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisableScope {
    Block,
    Inline,
}

/// A disable annotation in force on an expectation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveDisable {
    pub category: DisableCategory,
    pub reason: String,
    pub scope: DisableScope,
    /// Line of the annotation comment.
    pub line: usize,
}

/// Annotation context of one expectation line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineAnnotations {
    /// Block disable first, then inline.
    pub disables: Vec<ActiveDisable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl LineAnnotations {
    /// The disable that blocks an edit of category `edit`, if any.
    pub fn suppressing(&self, edit: DisableCategory) -> Option<&ActiveDisable> {
        self.disables.iter().find(|d| d.category.suppresses(edit))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpectationFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub lines: Vec<SourceLine>,
    pub expectations: Vec<Expectation>,
    /// Parallel to `expectations`.
    pub annotations: Vec<LineAnnotations>,
    /// Group name to expectation indices. Groups of the same name in
    /// separate blocks share one entry.
    pub groups: BTreeMap<String, BTreeSet<usize>>,
    pub tag_sets: TagSets,
    /// Declared result vocabulary; empty when the file has no `results`
    /// directive.
    pub results: BTreeSet<ResultKind>,
    pub conflict_resolution: ConflictResolution,
    pub conflicts_allowed: bool,
    /// Lowercased tags of the configuration being resolved.
    pub active_tags: BTreeSet<String>,
    /// Number of physical lines that make up the header region.
    pub header_end: usize,
}

impl ExpectationFile {
    /// Build a file from already-validated parts, laying out a header and
    /// one line per expectation. Line numbers are assigned sequentially.
    pub fn synthesize(
        expectations: Vec<Expectation>,
        tag_sets: TagSets,
        results: BTreeSet<ResultKind>,
        conflict_resolution: ConflictResolution,
        conflicts_allowed: bool,
    ) -> Self {
        let mut file = ExpectationFile {
            filename: None,
            lines: Vec::new(),
            expectations: Vec::with_capacity(expectations.len()),
            annotations: Vec::new(),
            groups: BTreeMap::new(),
            tag_sets,
            results,
            conflict_resolution,
            conflicts_allowed,
            active_tags: BTreeSet::new(),
            header_end: 0,
        };

        for text in file.header_lines() {
            file.push_line(LineKind::Directive, text, None);
        }
        if !file.lines.is_empty() {
            file.push_line(LineKind::Blank, String::new(), None);
        }
        file.header_end = file.lines.len();

        for expectation in expectations {
            let index = file.expectations.len();
            let number = file.lines.len() + 1;
            file.push_line(LineKind::Expectation, expectation.to_line(), Some(index));
            file.expectations.push(expectation.with_line_number(number));
            file.annotations.push(LineAnnotations::default());
        }
        file
    }

    fn push_line(&mut self, kind: LineKind, text: String, expectation: Option<usize>) {
        self.lines.push(SourceLine {
            number: self.lines.len() + 1,
            kind,
            text,
            ending: "\n".to_string(),
            expectation,
        });
    }

    fn header_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for set in self.tag_sets.iter() {
            out.push(format!("# tags: [ {} ]", set.raw_tags.join(" ")));
        }
        if !self.results.is_empty() {
            let names: Vec<&str> = self.results.iter().map(|r| r.as_str()).collect();
            out.push(format!("# results: [ {} ]", names.join(" ")));
        }
        if self.conflicts_allowed {
            out.push("# conflicts_allowed: true".to_string());
        }
        if self.conflict_resolution == ConflictResolution::Override {
            out.push("# conflict_resolution: OVERRIDE".to_string());
        }
        out
    }

    /// Validate and install the active tags.
    ///
    /// Tags are lowercased. When the file declares tag sets, every tag must
    /// be declared or ignored.
    pub fn set_tags<I, S>(&mut self, tags: I, ignored: &BTreeSet<String>) -> Result<(), UnknownTagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<String> = tags.into_iter().map(|t| normalize_tag(t.as_ref())).collect();
        let ignored: BTreeSet<String> = ignored.iter().map(|t| normalize_tag(t)).collect();
        if !self.tag_sets.is_empty() {
            let unknown = self.tag_sets.undeclared(&tags, &ignored);
            if !unknown.is_empty() {
                return Err(UnknownTagError { tags: unknown });
            }
        }
        self.active_tags = tags.into_iter().collect();
        Ok(())
    }

    /// The source text, byte for byte.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push_str(&line.ending);
        }
        out
    }

    /// Canonical rendering: header directives, a blank line, then every
    /// expectation. Comments and annotations are not carried over.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let header = self.header_lines();
        for line in &header {
            out.push_str(line);
            out.push('\n');
        }
        if !header.is_empty() {
            out.push('\n');
        }
        for e in &self.expectations {
            out.push_str(&e.to_line());
            out.push('\n');
        }
        out
    }

    /// The expectation parsed from physical line `number`.
    pub fn expectation_at_line(&self, number: usize) -> Option<&Expectation> {
        self.lines
            .get(number.checked_sub(1)?)
            .and_then(|l| l.expectation)
            .map(|i| &self.expectations[i])
    }

    /// Indices of the expectations in the group `name`.
    pub fn group_members(&self, name: &str) -> impl Iterator<Item = usize> + '_ {
        self.groups.get(name).into_iter().flatten().copied()
    }

    /// Every distinct bug reason in the file, in file order.
    pub fn bug_urls(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for e in &self.expectations {
            for url in &e.reason {
                if seen.insert(url.clone()) {
                    out.push(url.clone());
                }
            }
        }
        out
    }
}
