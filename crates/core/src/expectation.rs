//! The in-memory form of a single expectation line.

use crate::pattern::TestPattern;
use crate::result::ResultKind;
use crate::tags::normalize_tag;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// One rule predicting the allowed outcomes of a test under a tag
/// configuration.
///
/// `results` holds outcomes only; the `Slow` and `RetryOnFailure`
/// modifiers live in `is_slow_test` and `retry_on_failure`. `raw_tags` and
/// `raw_results` keep the spellings read from disk so the line can be
/// written back the way it was found.
#[derive(Debug, Clone, Serialize)]
pub struct Expectation {
    pub reason: Vec<String>,
    /// Lowercased.
    pub tags: BTreeSet<String>,
    pub raw_tags: Vec<String>,
    pub test: TestPattern,
    pub results: BTreeSet<ResultKind>,
    pub raw_results: Vec<String>,
    pub is_slow_test: bool,
    pub retry_on_failure: bool,
    /// Everything from the whitespace before `#` to the end of the line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    pub is_default_pass: bool,
}

impl Expectation {
    /// Build an expectation from parts. Modifiers in `results` become
    /// flags; a list of only modifiers implies `Pass`.
    pub fn new<T, R>(test: TestPattern, tags: T, results: &[ResultKind], reason: R) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let raw_tags: Vec<String> = tags.into_iter().map(|t| t.as_ref().to_string()).collect();
        let mut e = Expectation {
            reason: reason.into_iter().map(|r| r.as_ref().to_string()).collect(),
            tags: raw_tags.iter().map(|t| normalize_tag(t)).collect(),
            raw_tags,
            test,
            results: BTreeSet::new(),
            raw_results: results.iter().map(|r| r.as_str().to_string()).collect(),
            is_slow_test: false,
            retry_on_failure: false,
            trailing_comment: None,
            line_number: None,
            is_default_pass: false,
        };
        e.add_results(results.iter().copied());
        e
    }

    /// The synthetic result for a test no line applies to.
    pub fn default_pass(test_name: &str) -> Self {
        let mut e = Expectation::new(
            TestPattern::exact(test_name),
            Vec::<String>::new(),
            &[ResultKind::Pass],
            Vec::<String>::new(),
        );
        e.is_default_pass = true;
        e
    }

    pub fn with_trailing_comment(mut self, comment: impl Into<String>) -> Self {
        self.trailing_comment = Some(comment.into());
        self
    }

    pub fn with_line_number(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    /// True when every tag of this line is active and the pattern matches.
    /// `active_tags` must already be lowercased.
    pub fn applies(&self, active_tags: &BTreeSet<String>, test_name: &str) -> bool {
        self.tags.is_subset(active_tags) && self.test.matches(test_name)
    }

    /// Add results without touching `raw_results`.
    pub fn add_results<I: IntoIterator<Item = ResultKind>>(&mut self, results: I) {
        for result in results {
            match result {
                ResultKind::Slow => self.is_slow_test = true,
                ResultKind::RetryOnFailure => self.retry_on_failure = true,
                other => {
                    self.results.insert(other);
                }
            }
        }
        if self.results.is_empty() {
            self.results.insert(ResultKind::Pass);
        }
    }

    /// A bare `[ Pass ]` line, which only exists to annul a broader one.
    pub fn is_pass_only(&self) -> bool {
        self.results.len() == 1
            && self.results.contains(&ResultKind::Pass)
            && !self.is_slow_test
            && !self.retry_on_failure
    }

    /// Whether the line carries `Skip`.
    pub fn is_skip(&self) -> bool {
        self.results.contains(&ResultKind::Skip)
    }

    /// Same pattern, tags, results, modifiers and reason. Line position and
    /// trailing comment are not compared.
    pub fn same_rule(&self, other: &Expectation) -> bool {
        self.test == other.test
            && self.tags == other.tags
            && self.results == other.results
            && self.is_slow_test == other.is_slow_test
            && self.retry_on_failure == other.retry_on_failure
            && self.reason == other.reason
    }

    pub fn bug_urls(&self) -> &[String] {
        &self.reason
    }

    pub fn reason_string(&self) -> String {
        self.reason.join(" ")
    }

    /// Every result including modifiers, in the order the emitter writes
    /// them.
    pub fn all_results(&self) -> BTreeSet<ResultKind> {
        let mut all = self.results.clone();
        if self.is_slow_test {
            all.insert(ResultKind::Slow);
        }
        if self.retry_on_failure {
            all.insert(ResultKind::RetryOnFailure);
        }
        all
    }

    /// The line as it would appear in a file, without line terminator.
    pub fn to_line(&self) -> String {
        let mut out = String::new();
        if !self.reason.is_empty() {
            out.push_str(&self.reason.join(" "));
            out.push(' ');
        }

        let tags: Vec<&str> = if self.raw_tags.is_empty() {
            self.tags.iter().map(String::as_str).collect()
        } else {
            self.raw_tags.iter().map(String::as_str).collect()
        };
        if !tags.is_empty() {
            out.push_str("[ ");
            out.push_str(&tags.join(" "));
            out.push_str(" ] ");
        }

        out.push_str(&self.test.encode());

        let mut results: Vec<String> = if self.raw_results.is_empty() {
            self.all_results()
                .into_iter()
                .map(|r| r.as_str().to_string())
                .collect()
        } else {
            self.raw_results.clone()
        };
        results.sort();
        out.push_str(" [ ");
        out.push_str(&results.join(" "));
        out.push_str(" ]");

        if let Some(comment) = &self.trailing_comment {
            out.push_str(comment);
        }
        out
    }
}

impl PartialEq for Expectation {
    fn eq(&self, other: &Self) -> bool {
        self.same_rule(other)
            && self.trailing_comment == other.trailing_comment
            && self.is_default_pass == other.is_default_pass
    }
}

impl Eq for Expectation {}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
