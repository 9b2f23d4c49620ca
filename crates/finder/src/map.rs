//! Building the map of expectations to look for unexpected passes against.

use crate::age::recent_content;
use crate::error::FinderError;
use crate::vcs::BlameSource;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tagex_core::{parse_structure, Expectation, ParseOptions, ResultKind, TestPattern};
use time::Date;

/// Expectations per source file. Ad-hoc test lists use the empty path.
pub type ExpectationMap = BTreeMap<PathBuf, Vec<Expectation>>;

/// Parse the age-gated view of every file.
///
/// `Skip` lines and lines that only expect `Pass` are left out: neither can
/// be found to pass unexpectedly.
pub fn create_test_expectation_map<P: AsRef<Path>>(
    files: &[P],
    grace_period_days: i64,
    blame: &dyn BlameSource,
    today: Date,
) -> Result<ExpectationMap, FinderError> {
    let mut map = ExpectationMap::new();
    for path in files {
        let path = path.as_ref();
        let content = recent_content(path, grace_period_days, blame, today)?;
        let options = ParseOptions::new().filename(path.display().to_string());
        let file = parse_structure(&content, &options)?;
        let kept: Vec<Expectation> = file
            .expectations
            .into_iter()
            .filter(|e| !e.is_skip() && !e.is_pass_only())
            .collect();
        tracing::debug!(path = %path.display(), expectations = kept.len(), "mapped expectation file");
        map.insert(path.to_path_buf(), kept);
    }
    Ok(map)
}

/// A map for an ad-hoc list of tests, each expected to be flaky on every
/// configuration. Names ending in `*` are globs.
pub fn expectations_for_tests<I, S>(tests: I) -> ExpectationMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let expectations = tests
        .into_iter()
        .map(|name| {
            Expectation::new(
                TestPattern::from(name.as_ref()),
                Vec::<String>::new(),
                &[ResultKind::RetryOnFailure],
                Vec::<String>::new(),
            )
        })
        .collect();
    let mut map = ExpectationMap::new();
    map.insert(PathBuf::new(), expectations);
    map
}
