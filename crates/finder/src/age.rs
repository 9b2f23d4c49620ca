//! The age-gated view of an expectation file.
//!
//! Expectation lines authored within the grace period are dropped so that
//! freshly added expectations are not judged before they have had time to
//! collect results. Comments, blanks and directives always survive.

use crate::error::{FinderError, VcsError};
use crate::vcs::{BlameLine, BlameSource};
use std::path::Path;
use tagex_core::lexer::{self, LineKind};
use time::Date;

/// Read `path` and return its content with every expectation line younger
/// than `grace_period_days` removed. A negative grace period returns the
/// file untouched without consulting version control.
pub fn recent_content(
    path: &Path,
    grace_period_days: i64,
    blame: &dyn BlameSource,
    today: Date,
) -> Result<String, FinderError> {
    let content = std::fs::read_to_string(path).map_err(|e| FinderError::io(path, e))?;
    if grace_period_days < 0 {
        return Ok(content);
    }
    let lines = blame.blame(path)?;
    let view = filter_recent(&content, &lines, grace_period_days, today)?;
    tracing::debug!(
        path = %path.display(),
        grace_period_days,
        kept_bytes = view.len(),
        "built age-gated view"
    );
    Ok(view)
}

/// Apply the grace period to `content` using per-line blame dates.
///
/// A line is removed together with its terminator when it is an
/// expectation and its age in days is at most `grace_period_days`.
pub fn filter_recent(
    content: &str,
    blame: &[BlameLine],
    grace_period_days: i64,
    today: Date,
) -> Result<String, VcsError> {
    if grace_period_days < 0 {
        return Ok(content.to_string());
    }
    let physical = lexer::lines(content).count();
    if physical != blame.len() {
        return Err(VcsError::LineCountMismatch {
            expected: physical,
            actual: blame.len(),
        });
    }

    let mut out = String::with_capacity(content.len());
    for (line, authored) in lexer::lines(content).zip(blame) {
        let age = (today - authored.date).whole_days();
        if line.kind == LineKind::Expectation && age <= grace_period_days {
            continue;
        }
        out.push_str(line.text);
        out.push_str(line.ending);
    }
    Ok(out)
}
