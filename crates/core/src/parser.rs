/// Expectation file parser.
///
/// A single pass over the physical lines: header directives first, then
/// expectation lines interleaved with comments and `finder:` annotations.
/// The first structural problem stops parsing with a located
/// [`ParseError`]. Active tags are validated and conflicts checked once the
/// structure is known.
use crate::annotation::{inline_disable, parse_annotation, Annotation, DisableCategory};
use crate::conflicts::{check_conflicts, find_conflicts};
use crate::error::{ExpectationsError, ParseError};
use crate::expectation::Expectation;
use crate::file::{
    ActiveDisable, ConflictResolution, DisableScope, ExpectationFile, LineAnnotations, SourceLine,
};
use crate::lexer::{self, split_directive, split_trailing_comment, LineKind, DIRECTIVE_KEYS};
use crate::pattern::TestPattern;
use crate::result::ResultKind;
use crate::tags::{normalize_tag, TagSets};
use std::collections::{BTreeMap, BTreeSet};

/// Caller-side knobs for [`parse`].
#[derive(Default)]
pub struct ParseOptions<'a> {
    /// Used in diagnostics.
    pub filename: Option<String>,
    /// Active tags to install after parsing.
    pub tags: Vec<String>,
    /// Active tags that need not be declared.
    pub ignored_tags: BTreeSet<String>,
    /// Used when the file has no `conflict_resolution` directive.
    pub conflict_resolution: ConflictResolution,
    /// Extra mutual exclusion between tags of different sets.
    pub tags_conflict: Option<&'a dyn Fn(&str, &str) -> bool>,
    /// Accept result names in any letter case.
    pub lenient_results: bool,
}

impl<'a> ParseOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignored_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn conflict_resolution(mut self, mode: ConflictResolution) -> Self {
        self.conflict_resolution = mode;
        self
    }

    pub fn tags_conflict(mut self, predicate: &'a dyn Fn(&str, &str) -> bool) -> Self {
        self.tags_conflict = Some(predicate);
        self
    }

    pub fn lenient_results(mut self, lenient: bool) -> Self {
        self.lenient_results = lenient;
        self
    }
}

/// Parse `text` into an [`ExpectationFile`].
pub fn parse(text: &str, options: &ParseOptions<'_>) -> Result<ExpectationFile, ExpectationsError> {
    let mut file = parse_structure(text, options)?;
    file.set_tags(&options.tags, &options.ignored_tags)?;
    if file.conflicts_allowed {
        let conflicts = find_conflicts(&file, options.tags_conflict);
        if !conflicts.is_empty() {
            tracing::debug!(
                file = file.filename.as_deref().unwrap_or("<memory>"),
                patterns = conflicts.len(),
                "conflicting expectations allowed by conflicts_allowed"
            );
        }
    } else {
        check_conflicts(&file, options.tags_conflict)?;
    }
    tracing::debug!(
        file = file.filename.as_deref().unwrap_or("<memory>"),
        expectations = file.expectations.len(),
        tag_sets = file.tag_sets.len(),
        "parsed expectation file"
    );
    Ok(file)
}

/// Parse without installing active tags or checking conflicts.
pub fn parse_structure(text: &str, options: &ParseOptions<'_>) -> Result<ExpectationFile, ParseError> {
    let mut parser = Parser::new(options);
    for line in lexer::lines(text) {
        parser.line(line.number, line.kind, line.text)?;
        parser.lines.push(SourceLine {
            number: line.number,
            kind: parser.last_kind,
            text: line.text.to_string(),
            ending: line.ending.to_string(),
            expectation: parser.last_expectation,
        });
    }
    parser.finish()
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct PendingDirective {
    key: String,
    value: String,
    line: usize,
}

struct OpenDisable {
    category: DisableCategory,
    reason: String,
    line: usize,
}

struct Parser<'o, 'a> {
    options: &'o ParseOptions<'a>,
    lines: Vec<SourceLine>,
    expectations: Vec<Expectation>,
    annotations: Vec<LineAnnotations>,
    groups: BTreeMap<String, BTreeSet<usize>>,
    tag_sets: TagSets,
    results: BTreeSet<ResultKind>,
    conflict_resolution: ConflictResolution,
    conflicts_allowed: bool,

    in_header: bool,
    seen_directive: bool,
    header_end: usize,
    pending: Option<PendingDirective>,
    open_disable: Option<OpenDisable>,
    open_group: Option<(String, usize)>,

    last_kind: LineKind,
    last_expectation: Option<usize>,
}

impl<'o, 'a> Parser<'o, 'a> {
    fn new(options: &'o ParseOptions<'a>) -> Self {
        Parser {
            options,
            lines: Vec::new(),
            expectations: Vec::new(),
            annotations: Vec::new(),
            groups: BTreeMap::new(),
            tag_sets: TagSets::new(),
            results: BTreeSet::new(),
            conflict_resolution: options.conflict_resolution,
            conflicts_allowed: false,
            in_header: true,
            seen_directive: false,
            header_end: 0,
            pending: None,
            open_disable: None,
            open_group: None,
            last_kind: LineKind::Blank,
            last_expectation: None,
        }
    }

    fn err(&self, line: usize, msg: impl Into<String>) -> ParseError {
        ParseError::new(self.options.filename.as_deref(), line, msg)
    }

    fn end_header(&mut self, number: usize) {
        if self.in_header {
            self.in_header = false;
            self.header_end = number - 1;
        }
    }

    fn line(&mut self, number: usize, kind: LineKind, text: &str) -> Result<(), ParseError> {
        self.last_kind = kind;
        self.last_expectation = None;

        if self.pending.is_some() {
            return self.continue_directive(number, text);
        }

        match kind {
            LineKind::Blank | LineKind::Comment => {
                if self.in_header && self.seen_directive {
                    self.end_header(number);
                }
                Ok(())
            }
            LineKind::Directive => self.directive(number, text),
            LineKind::Annotation => {
                self.end_header(number);
                self.annotation(number, text)
            }
            LineKind::Expectation => {
                self.end_header(number);
                self.expectation(number, text)
            }
        }
    }

    fn finish(mut self) -> Result<ExpectationFile, ParseError> {
        if let Some(pending) = &self.pending {
            return Err(self.err(
                pending.line,
                format!("unterminated bracketed value for '{}'", pending.key),
            ));
        }
        if let Some(open) = &self.open_disable {
            return Err(self.err(
                open.line,
                format!(
                    "finder:disable-{} block is never closed by finder:enable-{}",
                    open.category, open.category
                ),
            ));
        }
        if let Some((name, line)) = &self.open_group {
            return Err(self.err(
                *line,
                format!("finder:group-start '{}' is never closed by finder:group-end", name),
            ));
        }
        if self.in_header {
            self.header_end = self.lines.len();
        }
        Ok(ExpectationFile {
            filename: self.options.filename.clone(),
            lines: self.lines,
            expectations: self.expectations,
            annotations: self.annotations,
            groups: self.groups,
            tag_sets: self.tag_sets,
            results: self.results,
            conflict_resolution: self.conflict_resolution,
            conflicts_allowed: self.conflicts_allowed,
            active_tags: BTreeSet::new(),
            header_end: self.header_end,
        })
    }

    // ── Header directives ────────────────────────────────────────────

    fn directive(&mut self, number: usize, text: &str) -> Result<(), ParseError> {
        let Some((key, value)) = split_directive(text) else {
            return Ok(());
        };
        if !DIRECTIVE_KEYS.contains(&key) {
            if self.in_header {
                return Err(self.err(number, format!("unknown header directive '{}'", key)));
            }
            self.last_kind = LineKind::Comment;
            return Ok(());
        }
        if !self.in_header {
            return Err(self.err(
                number,
                format!(
                    "'{}' directive must appear in the header, before any expectation, \
                     annotation, or non-directive comment",
                    key
                ),
            ));
        }
        self.seen_directive = true;
        if value.starts_with('[') && !value.contains(']') {
            self.pending = Some(PendingDirective {
                key: key.to_string(),
                value: value.to_string(),
                line: number,
            });
            return Ok(());
        }
        self.apply_directive(number, key, value)
    }

    fn continue_directive(&mut self, number: usize, text: &str) -> Result<(), ParseError> {
        let Some(body) = text.trim().strip_prefix('#') else {
            let key = self.pending.as_ref().map(|p| p.key.clone()).unwrap_or_default();
            return Err(self.err(number, format!("unterminated bracketed value for '{}'", key)));
        };
        self.last_kind = LineKind::Directive;
        let done = body.contains(']');
        if let Some(pending) = self.pending.as_mut() {
            pending.value.push(' ');
            pending.value.push_str(body.trim());
        }
        if done {
            if let Some(pending) = self.pending.take() {
                return self.apply_directive(pending.line, &pending.key, &pending.value);
            }
        }
        Ok(())
    }

    fn apply_directive(&mut self, number: usize, key: &str, value: &str) -> Result<(), ParseError> {
        match key {
            "tags" => {
                let tags = self.bracket_list(number, key, value)?;
                self.tag_sets.declare(tags, number).map_err(|tag| {
                    self.err(
                        number,
                        format!("tag '{}' is declared in more than one tag set", tag),
                    )
                })
            }
            "results" => {
                for name in self.bracket_list(number, key, value)? {
                    let kind = ResultKind::from_canonical(&name).ok_or_else(|| {
                        self.err(number, unknown_result_message(&name))
                    })?;
                    self.results.insert(kind);
                }
                Ok(())
            }
            "conflicts_allowed" => {
                self.conflicts_allowed = match value.to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(self.err(
                            number,
                            format!("conflicts_allowed must be true or false, found '{}'", value),
                        ))
                    }
                };
                Ok(())
            }
            "conflict_resolution" => {
                self.conflict_resolution = ConflictResolution::from_name(value).ok_or_else(|| {
                    self.err(
                        number,
                        format!(
                            "conflict_resolution must be UNION or OVERRIDE, found '{}'",
                            value
                        ),
                    )
                })?;
                Ok(())
            }
            other => Err(self.err(number, format!("unknown header directive '{}'", other))),
        }
    }

    fn bracket_list(&self, number: usize, key: &str, value: &str) -> Result<Vec<String>, ParseError> {
        let inner = value
            .trim()
            .strip_prefix('[')
            .and_then(|v| v.rfind(']').map(|end| &v[..end]))
            .ok_or_else(|| {
                self.err(number, format!("'{}' expects a bracketed list, found '{}'", key, value))
            })?;
        let items: Vec<String> = inner.split_whitespace().map(str::to_string).collect();
        if items.is_empty() {
            return Err(self.err(number, format!("'{}' list is empty", key)));
        }
        Ok(items)
    }

    // ── Annotations ──────────────────────────────────────────────────

    fn annotation(&mut self, number: usize, text: &str) -> Result<(), ParseError> {
        let annotation = parse_annotation(text)
            .map_err(|msg| self.err(number, msg))?
            .ok_or_else(|| self.err(number, "malformed finder annotation"))?;

        match annotation {
            Annotation::Disable { category, reason } => {
                if let Some(open) = &self.open_disable {
                    return Err(self.err(
                        number,
                        format!(
                            "found a finder:disable-{} annotation inside the finder:disable-{} \
                             block opened on line {}",
                            category, open.category, open.line
                        ),
                    ));
                }
                self.open_disable = Some(OpenDisable {
                    category,
                    reason,
                    line: number,
                });
            }
            Annotation::Enable { category } => match self.open_disable.take() {
                None => {
                    return Err(self.err(
                        number,
                        format!(
                            "found a finder:enable-{} annotation without a preceding disable",
                            category
                        ),
                    ))
                }
                Some(open) if open.category != category => {
                    return Err(self.err(
                        number,
                        format!(
                            "finder:enable-{} does not match the finder:disable-{} block \
                             opened on line {}",
                            category, open.category, open.line
                        ),
                    ))
                }
                Some(_) => {}
            },
            Annotation::GroupStart { name } => {
                if self.open_group.is_some() {
                    return Err(self.err(
                        number,
                        "found a finder:group-start annotation that is inside another group block",
                    ));
                }
                if name.is_empty() {
                    return Err(self.err(
                        number,
                        "found a finder:group-start annotation that did not have a group name",
                    ));
                }
                self.open_group = Some((name, number));
            }
            Annotation::GroupEnd => {
                if self.open_group.take().is_none() {
                    return Err(self.err(
                        number,
                        "found a finder:group-end annotation without a group start comment",
                    ));
                }
            }
        }
        Ok(())
    }

    // ── Expectation lines ────────────────────────────────────────────

    fn expectation(&mut self, number: usize, text: &str) -> Result<(), ParseError> {
        let mut expectation = self.expectation_line(number, text)?;
        expectation.line_number = Some(number);

        let mut annotations = LineAnnotations::default();
        if let Some(open) = &self.open_disable {
            annotations.disables.push(ActiveDisable {
                category: open.category,
                reason: open.reason.clone(),
                scope: DisableScope::Block,
                line: open.line,
            });
        }
        if let Some((category, reason)) = expectation
            .trailing_comment
            .as_deref()
            .and_then(inline_disable)
        {
            annotations.disables.push(ActiveDisable {
                category,
                reason,
                scope: DisableScope::Inline,
                line: number,
            });
        }

        let index = self.expectations.len();
        if let Some((name, _)) = &self.open_group {
            self.groups.entry(name.clone()).or_default().insert(index);
            annotations.group = Some(name.clone());
        }

        self.expectations.push(expectation);
        self.annotations.push(annotations);
        self.last_expectation = Some(index);
        Ok(())
    }

    fn expectation_line(&self, number: usize, text: &str) -> Result<Expectation, ParseError> {
        let (body, trailing) = split_trailing_comment(text);
        let tokens: Vec<&str> = body.split_whitespace().collect();

        for token in &tokens {
            if (token.starts_with('[') && *token != "[") || (token.ends_with(']') && *token != "]")
            {
                return Err(self.err(
                    number,
                    format!(
                        "brackets must be separated from their contents by spaces, found '{}'",
                        token
                    ),
                ));
            }
        }

        let mut pos = 0;
        let mut reason = Vec::new();
        while pos < tokens.len() && tokens.len() - pos >= 5 && is_bug_reference(tokens[pos]) {
            reason.push(tokens[pos].to_string());
            pos += 1;
        }

        let mut raw_tags = Vec::new();
        if tokens.get(pos) == Some(&"[") {
            let close = closing_bracket(&tokens, pos)
                .ok_or_else(|| self.err(number, "tag list is missing its closing ']'"))?;
            raw_tags = tokens[pos + 1..close].iter().map(|t| t.to_string()).collect();
            pos = close + 1;
        }

        let test_token = match tokens.get(pos) {
            Some(t) if *t != "[" => *t,
            _ => return Err(self.err(number, "expectation line is missing its test pattern")),
        };
        let test = TestPattern::decode(test_token).map_err(|msg| self.err(number, msg))?;
        pos += 1;

        if tokens.get(pos) != Some(&"[") {
            return Err(self.err(number, "expected '[' to open the results list"));
        }
        let close = closing_bracket(&tokens, pos)
            .ok_or_else(|| self.err(number, "results list is missing its closing ']'"))?;
        let raw_results: Vec<String> = tokens[pos + 1..close].iter().map(|t| t.to_string()).collect();
        if raw_results.is_empty() {
            return Err(self.err(number, "results list is empty"));
        }
        if let Some(extra) = tokens.get(close + 1) {
            return Err(self.err(number, format!("unexpected token '{}' after results", extra)));
        }

        self.check_tags(number, &raw_tags)?;
        let results = self.check_results(number, &raw_results)?;

        let mut expectation = Expectation::new(test, raw_tags, &results, reason);
        expectation.raw_results = raw_results;
        expectation.trailing_comment = trailing.map(str::to_string);
        Ok(expectation)
    }

    fn check_tags(&self, number: usize, raw_tags: &[String]) -> Result<(), ParseError> {
        let tags: Vec<String> = raw_tags.iter().map(|t| normalize_tag(t)).collect();
        for (i, tag) in tags.iter().enumerate() {
            if tags[..i].contains(tag) {
                return Err(self.err(number, format!("tag '{}' is repeated", tag)));
            }
            if !self.tag_sets.is_empty() && !self.tag_sets.contains(tag) {
                return Err(self.err(
                    number,
                    format!("tag '{}' is not declared in any tag set", raw_tags[i]),
                ));
            }
            if let Some(other) = tags[..i]
                .iter()
                .find(|other| self.tag_sets.mutually_exclusive(other, tag))
            {
                return Err(self.err(
                    number,
                    format!(
                        "tags '{}' and '{}' belong to the same tag set and cannot appear \
                         on one line",
                        other, tag
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_results(&self, number: usize, raw_results: &[String]) -> Result<Vec<ResultKind>, ParseError> {
        let mut results = Vec::with_capacity(raw_results.len());
        for name in raw_results {
            let kind = match ResultKind::from_canonical(name) {
                Some(kind) => kind,
                None => match ResultKind::from_any_case(name) {
                    Some(kind) if self.options.lenient_results => kind,
                    _ => return Err(self.err(number, unknown_result_message(name))),
                },
            };
            if !self.results.is_empty() && !self.results.contains(&kind) {
                return Err(self.err(
                    number,
                    format!("result '{}' is not declared in the results directive", name),
                ));
            }
            results.push(kind);
        }
        Ok(results)
    }
}

fn unknown_result_message(name: &str) -> String {
    match ResultKind::from_any_case(name) {
        Some(kind) => format!("result '{}' must be written '{}'", name, kind),
        None => format!("unknown result '{}'", name),
    }
}

fn closing_bracket(tokens: &[&str], open: usize) -> Option<usize> {
    tokens[open + 1..]
        .iter()
        .position(|t| *t == "]")
        .map(|offset| open + 1 + offset)
}

/// Any bare token with a `/` in it: `crbug.com/123`, `skbug.com/foo/456`,
/// `crbug/1234`, `b/1234`.
fn is_bug_reference(token: &str) -> bool {
    token.contains('/') && !token.starts_with('[') && !token.starts_with('#')
}
