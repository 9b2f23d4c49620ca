//! `tagex.toml` configuration.
//!
//! # Example
//!
//! ```toml
//! grace_period_days = 7
//! ignored_tags = ["webgpu-adapter-default"]
//! expectation_files = ["gpu/expectations.txt", "gpu/flakes.txt"]
//!
//! [[overlapping_tags]]
//! keep = "nvidia"
//! drop = "intel"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tagex_finder::{OverlapRule, OverlapRules};

/// Settings shared by every subcommand. Command-line flags win over these.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Expectations younger than this many days are hidden from `recent`.
    pub grace_period_days: i64,
    pub ignored_tags: Vec<String>,
    /// Files searched by `orphans` when none are given.
    pub expectation_files: Vec<PathBuf>,
    /// Tag pairs that name the same hardware; the `drop` tag is removed
    /// from narrowed tag sets that also carry `keep`.
    pub overlapping_tags: Vec<OverlapRule>,
}

impl Config {
    /// Configured ignored tags followed by `extra`.
    pub(crate) fn ignored_tags_with(&self, extra: Vec<String>) -> Vec<String> {
        let mut tags = self.ignored_tags.clone();
        tags.extend(extra);
        tags
    }

    pub(crate) fn consolidator(&self) -> OverlapRules {
        OverlapRules(self.overlapping_tags.clone())
    }
}

/// Read the configuration at `path`, or the defaults when no path is
/// given. Relative `expectation_files` resolve against the config file's
/// directory.
pub(crate) fn load(path: Option<&Path>) -> Result<Config, String> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    config.expectation_files = config
        .expectation_files
        .into_iter()
        .map(|f| if f.is_relative() { base.join(f) } else { f })
        .collect();
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}
