//! Mapping a test name to its effective expectation.

use crate::expectation::Expectation;
use crate::file::{ConflictResolution, ExpectationFile};
use crate::pattern::TestPattern;
use std::collections::BTreeSet;

/// The effective expectation for `test_name` under the file's active tags.
///
/// Exact lines win over globs; among globs only the longest matching
/// prefix counts. When nothing applies the default pass is returned.
pub fn expectations_for(file: &ExpectationFile, test_name: &str) -> Expectation {
    expectations_for_tags(file, &file.active_tags, test_name)
}

/// Like [`expectations_for`], with an explicit set of lowercased active
/// tags.
pub fn expectations_for_tags(
    file: &ExpectationFile,
    active_tags: &BTreeSet<String>,
    test_name: &str,
) -> Expectation {
    let mut applicable: Vec<&Expectation> = file
        .expectations
        .iter()
        .filter(|e| !e.test.is_glob() && e.applies(active_tags, test_name))
        .collect();

    if applicable.is_empty() {
        let globs: Vec<&Expectation> = file
            .expectations
            .iter()
            .filter(|e| e.test.is_glob() && e.applies(active_tags, test_name))
            .collect();
        let longest = globs.iter().map(|e| e.test.prefix().len()).max().unwrap_or(0);
        applicable = globs
            .into_iter()
            .filter(|e| e.test.prefix().len() == longest)
            .collect();
    }

    if applicable.is_empty() {
        return Expectation::default_pass(test_name);
    }

    match file.conflict_resolution {
        ConflictResolution::Union => {
            if applicable.iter().any(|e| !e.is_pass_only()) {
                applicable.retain(|e| !e.is_pass_only());
            }
            combine_union(test_name, &applicable)
        }
        ConflictResolution::Override => combine_override(test_name, &applicable),
    }
}

fn resolved(test_name: &str, applicable: &[&Expectation]) -> Expectation {
    let tags: BTreeSet<String> = applicable.iter().flat_map(|e| e.tags.iter().cloned()).collect();
    let mut out = Expectation::new(
        TestPattern::exact(test_name),
        tags,
        &[],
        Vec::<String>::new(),
    );
    out.results.clear();
    out.raw_results.clear();
    out.line_number = applicable.last().and_then(|e| e.line_number);
    out
}

fn combine_union(test_name: &str, applicable: &[&Expectation]) -> Expectation {
    let mut out = resolved(test_name, applicable);
    let mut comments = Vec::new();
    for e in applicable {
        out.results.extend(e.results.iter().copied());
        out.is_slow_test |= e.is_slow_test;
        out.retry_on_failure |= e.retry_on_failure;
        for reason in &e.reason {
            if !out.reason.contains(reason) {
                out.reason.push(reason.clone());
            }
        }
        if let Some(comment) = &e.trailing_comment {
            comments.push(comment.as_str());
        }
    }
    if !comments.is_empty() {
        out.trailing_comment = Some(comments.join("\n"));
    }
    out
}

fn combine_override(test_name: &str, applicable: &[&Expectation]) -> Expectation {
    let mut out = resolved(test_name, applicable);
    if let Some(last) = applicable.last() {
        out.results = last.results.clone();
        out.is_slow_test = last.is_slow_test;
        out.retry_on_failure = last.retry_on_failure;
        out.reason = last.reason.clone();
        out.trailing_comment = last.trailing_comment.clone();
    }
    out
}

/// Expectations whose pattern matches none of `existing_tests`.
///
/// A glob is live when any test starts with its prefix, including a test
/// equal to the prefix itself.
pub fn check_for_broken_expectations<I, S>(file: &ExpectationFile, existing_tests: I) -> Vec<Expectation>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tests: BTreeSet<String> = existing_tests
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .collect();
    file.expectations
        .iter()
        .filter(|e| {
            if e.test.is_glob() {
                let prefix = e.test.prefix();
                !tests
                    .range(prefix.to_string()..)
                    .next()
                    .is_some_and(|t| t.starts_with(prefix))
            } else {
                !tests.contains(e.test.as_str())
            }
        })
        .cloned()
        .collect()
}
