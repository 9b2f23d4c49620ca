#![allow(clippy::result_large_err)]
//! tagex-core: tagged test expectations.
//!
//! Parses expectation files, resolves the effective expectation for a test
//! under a set of active tags, checks for conflicting lines, and merges
//! parsed collections.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`parse()`] -- text to [`ExpectationFile`]
//! - [`expectations_for()`] -- resolve one test name
//! - [`check_for_broken_expectations()`] -- lines matching no known test
//! - [`merge()`] -- combine two collections
//! - [`Expectation`], [`TestPattern`], [`ResultKind`], [`TagSets`]
//! - errors: [`ParseError`], [`ConflictError`], [`UnknownTagError`],
//!   [`MergeError`], [`ExpectationsError`]

pub mod annotation;
pub mod conflicts;
pub mod error;
pub mod expectation;
pub mod file;
pub mod lexer;
pub mod merge;
pub mod parser;
pub mod pattern;
pub mod resolver;
pub mod result;
pub mod tags;

// ── Convenience re-exports: key types ────────────────────────────────

pub use annotation::{Annotation, DisableCategory};
pub use error::{
    ConflictError, ExpectationsError, MergeError, ParseError, PatternConflicts, UnknownTagError,
};
pub use expectation::Expectation;
pub use file::{ConflictResolution, ExpectationFile, LineAnnotations, SourceLine};
pub use lexer::LineKind;
pub use pattern::TestPattern;
pub use result::ResultKind;
pub use tags::TagSets;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use conflicts::{check_conflicts, find_conflicts};
pub use merge::merge;
pub use parser::{parse, parse_structure, ParseOptions};
pub use resolver::{check_for_broken_expectations, expectations_for, expectations_for_tags};
