//! Test patterns: exact names or trailing-star prefix globs.
//!
//! On disk a pattern is URL-escaped for space (`%20`) and percent (`%25`),
//! and a literal star is written `\*`. An unescaped `*` is only legal as
//! the final character, where it turns the pattern into a prefix glob.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded test pattern.
///
/// `text` is the decoded name; for globs it keeps the trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TestPattern {
    text: String,
    glob: bool,
}

impl TestPattern {
    /// A pattern that only matches `name` itself, stars included.
    pub fn exact(name: impl Into<String>) -> Self {
        TestPattern {
            text: name.into(),
            glob: false,
        }
    }

    /// A prefix glob. A trailing `*` is appended when missing.
    pub fn glob(prefix: impl Into<String>) -> Self {
        let mut text = prefix.into();
        if !text.ends_with('*') {
            text.push('*');
        }
        TestPattern { text, glob: true }
    }

    /// Decode a pattern as written in an expectation file.
    pub fn decode(encoded: &str) -> Result<Self, String> {
        let chars: Vec<char> = encoded.chars().collect();
        let mut text = String::with_capacity(encoded.len());
        let mut glob = false;
        let mut pos = 0usize;

        while pos < chars.len() {
            let c = chars[pos];
            if c == '\\' && chars.get(pos + 1) == Some(&'*') {
                text.push('*');
                pos += 2;
                continue;
            }
            if c == '%' && pos + 2 < chars.len() {
                let code: String = chars[pos + 1..pos + 3].iter().collect();
                match code.as_str() {
                    "20" => {
                        text.push(' ');
                        pos += 3;
                        continue;
                    }
                    "25" => {
                        text.push('%');
                        pos += 3;
                        continue;
                    }
                    _ => {}
                }
            }
            if c == '*' {
                if pos + 1 != chars.len() {
                    return Err(format!(
                        "invalid glob in test pattern '{}': '*' is only allowed at the end; \
                         write a literal star as '\\*'",
                        encoded
                    ));
                }
                glob = true;
            }
            text.push(c);
            pos += 1;
        }

        if text.is_empty() {
            return Err("empty test pattern".to_string());
        }
        Ok(TestPattern { text, glob })
    }

    /// Re-encode for writing back to a file.
    pub fn encode(&self) -> String {
        let body = self.prefix();
        let mut out = String::with_capacity(self.text.len() + 4);
        for c in body.chars() {
            match c {
                '%' => out.push_str("%25"),
                ' ' => out.push_str("%20"),
                '*' => out.push_str("\\*"),
                other => out.push(other),
            }
        }
        if self.glob {
            out.push('*');
        }
        out
    }

    pub fn is_glob(&self) -> bool {
        self.glob
    }

    /// The decoded pattern, including the trailing `*` of a glob.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The part a test name must start with (globs) or equal (exact).
    pub fn prefix(&self) -> &str {
        if self.glob {
            &self.text[..self.text.len() - 1]
        } else {
            &self.text
        }
    }

    pub fn matches(&self, test_name: &str) -> bool {
        if self.glob {
            test_name.starts_with(self.prefix())
        } else {
            self.text == test_name
        }
    }

    /// Whether some test name could be matched by both patterns.
    pub fn overlaps(&self, other: &TestPattern) -> bool {
        match (self.glob, other.glob) {
            (false, false) => self.text == other.text,
            (true, false) => other.text.starts_with(self.prefix()),
            (false, true) => self.text.starts_with(other.prefix()),
            (true, true) => {
                self.prefix().starts_with(other.prefix())
                    || other.prefix().starts_with(self.prefix())
            }
        }
    }
}

impl From<&str> for TestPattern {
    /// Treats a trailing `*` as a glob; use [`TestPattern::exact`] for a
    /// literal trailing star.
    fn from(s: &str) -> Self {
        if s.ends_with('*') {
            TestPattern::glob(s)
        } else {
            TestPattern::exact(s)
        }
    }
}

impl From<TestPattern> for String {
    fn from(p: TestPattern) -> String {
        p.encode()
    }
}

impl TryFrom<String> for TestPattern {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TestPattern::decode(&s)
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
