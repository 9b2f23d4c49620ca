//! The closed vocabulary of expected results and modifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One result name usable inside the results brackets of an expectation.
///
/// Variants are declared in alphabetical order so that ordered collections
/// of results iterate in the order the emitter writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Crash,
    Failure,
    Pass,
    RetryOnFailure,
    Skip,
    Slow,
    Timeout,
}

impl ResultKind {
    pub const ALL: [ResultKind; 7] = [
        ResultKind::Crash,
        ResultKind::Failure,
        ResultKind::Pass,
        ResultKind::RetryOnFailure,
        ResultKind::Skip,
        ResultKind::Slow,
        ResultKind::Timeout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Crash => "Crash",
            ResultKind::Failure => "Failure",
            ResultKind::Pass => "Pass",
            ResultKind::RetryOnFailure => "RetryOnFailure",
            ResultKind::Skip => "Skip",
            ResultKind::Slow => "Slow",
            ResultKind::Timeout => "Timeout",
        }
    }

    /// Exact, case-sensitive lookup of a canonical name.
    pub fn from_canonical(name: &str) -> Option<ResultKind> {
        ResultKind::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Case-insensitive lookup, used for lenient parsing and diagnostics.
    pub fn from_any_case(name: &str) -> Option<ResultKind> {
        ResultKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }

    /// `Slow` and `RetryOnFailure` modify how a test runs rather than
    /// naming an outcome.
    pub fn is_modifier(self) -> bool {
        matches!(self, ResultKind::Slow | ResultKind::RetryOnFailure)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_lookup_is_case_sensitive() {
        assert_eq!(ResultKind::from_canonical("Skip"), Some(ResultKind::Skip));
        assert_eq!(ResultKind::from_canonical("SKIP"), None);
        assert_eq!(ResultKind::from_canonical("skip"), None);
        assert_eq!(ResultKind::from_any_case("SKIP"), Some(ResultKind::Skip));
        assert_eq!(ResultKind::from_any_case("Flaky"), None);
    }

    #[test]
    fn test_ordering_is_alphabetical() {
        let mut sorted = ResultKind::ALL.to_vec();
        sorted.sort_by_key(|k| k.as_str());
        assert_eq!(sorted, ResultKind::ALL.to_vec());
    }

    #[test]
    fn test_modifiers() {
        assert!(ResultKind::Slow.is_modifier());
        assert!(ResultKind::RetryOnFailure.is_modifier());
        assert!(!ResultKind::Failure.is_modifier());
    }
}
