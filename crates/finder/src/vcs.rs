//! Per-line authorship dates from version control.
//!
//! The [`BlameSource`] trait keeps the age-gated view independent of git;
//! [`GitBlame`] shells out to `git blame` and [`InMemoryBlame`] serves
//! canned dates in tests.

use crate::error::VcsError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use time::macros::format_description;
use time::Date;

/// One line of a blamed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub date: Date,
    pub text: String,
}

/// Source of authorship dates for every line of a file, in file order.
pub trait BlameSource {
    fn blame(&self, path: &Path) -> Result<Vec<BlameLine>, VcsError>;
}

/// Runs `git blame` in the directory containing the file.
#[derive(Debug, Clone)]
pub struct GitBlame {
    program: String,
}

impl GitBlame {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a different git executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitBlame {
    fn default() -> Self {
        Self::new()
    }
}

impl BlameSource for GitBlame {
    fn blame(&self, path: &Path) -> Result<Vec<BlameLine>, VcsError> {
        let mut cmd = Command::new(&self.program);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            cmd.arg("-C").arg(parent);
        }
        let file = path.file_name().map(Path::new).unwrap_or(path);
        cmd.arg("blame").arg("--").arg(file);
        tracing::debug!(path = %path.display(), "running git blame");

        let output = cmd.output().map_err(|source| VcsError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_blame_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Canned blame results keyed by path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlame {
    files: HashMap<PathBuf, Vec<BlameLine>>,
}

impl InMemoryBlame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, lines: Vec<BlameLine>) {
        self.files.insert(path.into(), lines);
    }

    /// Blame every line of `content` with the date at the same position in
    /// `dates`.
    pub fn insert_content(&mut self, path: impl Into<PathBuf>, content: &str, dates: &[Date]) {
        let lines = content
            .lines()
            .zip(dates)
            .map(|(text, date)| BlameLine {
                date: *date,
                text: text.to_string(),
            })
            .collect();
        self.insert(path, lines);
    }
}

impl BlameSource for InMemoryBlame {
    fn blame(&self, path: &Path) -> Result<Vec<BlameLine>, VcsError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| VcsError::CommandFailed {
                status: "no blame recorded".to_string(),
                stderr: path.display().to_string(),
            })
    }
}

/// Parse the full output of `git blame`.
pub fn parse_blame_output(output: &str) -> Result<Vec<BlameLine>, VcsError> {
    output
        .lines()
        .enumerate()
        .map(|(i, line)| {
            parse_blame_line(line).ok_or_else(|| VcsError::Malformed {
                line: i + 1,
                text: line.to_string(),
            })
        })
        .collect()
}

/// Parse one line of default `git blame` output:
/// `<hash> [<file>] (<author> YYYY-MM-DD HH:MM:SS <tz> <n>)<content>`.
pub fn parse_blame_line(line: &str) -> Option<BlameLine> {
    let format = format_description!("[year]-[month]-[day]");
    for (close, _) in line.match_indices(')') {
        let mut fields = line[..close].split_whitespace().rev();
        let (Some(number), Some(zone), Some(clock), Some(day)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let looks_right = number.bytes().all(|b| b.is_ascii_digit())
            && zone.len() == 5
            && zone.starts_with(['+', '-'])
            && clock.len() == 8
            && clock.bytes().filter(|b| *b == b':').count() == 2;
        if !looks_right {
            continue;
        }
        if let Ok(date) = Date::parse(day, format) {
            return Some(BlameLine {
                date,
                text: line[close + 1..].to_string(),
            });
        }
    }
    None
}
