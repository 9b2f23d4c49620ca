use std::path::PathBuf;
use tagex_core::ExpectationsError;

/// Failures of the version-control collaborator.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// The blame program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The blame program ran but exited unsuccessfully.
    #[error("blame exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    /// A line of blame output did not have the expected shape.
    #[error("malformed blame output on line {line}: {text}")]
    Malformed { line: usize, text: String },

    /// Blame covered a different number of lines than the file has.
    #[error("blame covered {actual} lines but the file has {expected}")]
    LineCountMismatch { expected: usize, actual: usize },
}

/// All errors that can be returned by the finder operations.
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// Reading or writing an expectation file failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expectation file could not be parsed.
    #[error(transparent)]
    Parse(#[from] ExpectationsError),

    /// Authorship dates could not be obtained.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// An edit would have left the file with broken annotation blocks.
    #[error("{}: edited content no longer parses: {message}", path.display())]
    Annotation { path: PathBuf, message: String },
}

impl FinderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FinderError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<tagex_core::ParseError> for FinderError {
    fn from(e: tagex_core::ParseError) -> Self {
        FinderError::Parse(ExpectationsError::Parse(e))
    }
}

/// Why one semi-stale expectation could not be narrowed. Narrowing moves on
/// to the next expectation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrowingError {
    /// A build reported more than one tag set.
    #[error("step {step} reported {count} tag sets; expected exactly one")]
    MultipleTagSets { step: String, count: usize },

    /// A passing configuration carries every tag of a failing one.
    #[error("passing tags [ {} ] are a superset of failing tags [ {} ]", passing.join(" "), failing.join(" "))]
    PassingSupersetOfFailing {
        failing: Vec<String>,
        passing: Vec<String>,
    },

    /// A narrowed tag is not declared in any tag set of the file.
    #[error("tag '{tag}' is not declared in any tag set")]
    UndeclaredTag { tag: String },
}
