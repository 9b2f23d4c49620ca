#![allow(clippy::result_large_err)]
//! tagex-finder: maintenance of expectation files against build results.
//!
//! Works on files on disk: an age-gated view that hides freshly added
//! lines, removal of stale expectations, narrowing of semi-stale ones, and
//! a search for bugs that no expectation mentions any more.
//!
//! - [`recent_content()`] -- file text minus lines inside the grace period
//! - [`create_test_expectation_map()`] -- expectations to check per file
//! - [`remove_expectations_from_file()`] -- drop lines, honoring annotations
//! - [`narrow_semi_stale_scope()`] -- rewrite tags from build observations
//! - [`find_orphaned_bugs()`] -- bug URLs referenced by no file

pub mod age;
pub mod error;
pub mod map;
pub mod narrowing;
pub mod orphans;
pub mod removal;
pub mod vcs;
pub mod write;

pub use age::{filter_recent, recent_content};
pub use error::{FinderError, NarrowingError, VcsError};
pub use map::{create_test_expectation_map, expectations_for_tests, ExpectationMap};
pub use narrowing::{
    narrow_semi_stale_scope, narrow_semi_stale_scope_in_content, narrowed_tag_sets, BuildStats,
    NarrowingOutcome, NoConsolidation, OverlapRule, OverlapRules, SemiStaleExpectation,
    SkippedNarrowing, TagConsolidator,
};
pub use orphans::find_orphaned_bugs;
pub use removal::{
    find_expectation_line, remove_expectations_from_content, remove_expectations_from_file,
    RemovalOutcome, RemovalType, SuppressedRemoval,
};
pub use vcs::{BlameLine, BlameSource, GitBlame, InMemoryBlame};

/// Today's date in the local time zone, or UTC when the local offset
/// cannot be determined.
pub fn today() -> time::Date {
    time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .date()
}
