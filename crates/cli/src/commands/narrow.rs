//! `tagex narrow`: observations file format.
//!
//! ```json
//! [
//!   {
//!     "line": 12,
//!     "steps": {
//!       "linux_nvidia_tests": { "tag_sets": [["linux", "nvidia"]], "failed_builds": 3 },
//!       "linux_amd_tests": { "tag_sets": [["linux", "amd"]], "passed_builds": 5 }
//!     }
//!   }
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tagex_core::{parse_structure, ParseOptions};
use tagex_finder::{narrow_semi_stale_scope, BuildStats, SemiStaleExpectation, TagConsolidator};

use super::read_or_exit;
use crate::{fail, print_json, OutputFormat};

/// Build results for the expectation on `line` of the target file.
#[derive(Debug, Deserialize)]
struct Observation {
    line: usize,
    steps: BTreeMap<String, BuildStats>,
}

pub(crate) fn cmd_narrow(
    file: &Path,
    observations_file: &Path,
    consolidator: &dyn TagConsolidator,
    output: OutputFormat,
    quiet: bool,
) {
    let raw = read_or_exit(observations_file, output, quiet);
    let observations: Vec<Observation> = match serde_json::from_str(&raw) {
        Ok(o) => o,
        Err(e) => fail(
            &format!("error parsing JSON in '{}': {}", observations_file.display(), e),
            output,
            quiet,
        ),
    };

    let content = read_or_exit(file, output, quiet);
    let options = ParseOptions::new().filename(file.display().to_string());
    let parsed = match parse_structure(&content, &options) {
        Ok(p) => p,
        Err(e) => fail(&e.to_string(), output, quiet),
    };

    let mut semi_stale = Vec::with_capacity(observations.len());
    for obs in observations {
        let Some(expectation) = parsed.expectation_at_line(obs.line) else {
            fail(
                &format!("line {} of '{}' is not an expectation", obs.line, file.display()),
                output,
                quiet,
            );
        };
        semi_stale.push(SemiStaleExpectation {
            expectation: expectation.clone(),
            steps: obs.steps,
        });
    }

    let outcome = match narrow_semi_stale_scope(file, &semi_stale, consolidator) {
        Ok(o) => o,
        Err(e) => fail(&e.to_string(), output, quiet),
    };

    match output {
        OutputFormat::Text => {
            for url in &outcome.touched_urls {
                println!("{}", url);
            }
            if !quiet {
                for s in &outcome.skipped {
                    match s.line {
                        Some(line) => eprintln!("skipped line {}: {}", line, s.reason),
                        None => eprintln!("skipped {}: {}", s.expectation, s.reason),
                    }
                }
            }
        }
        OutputFormat::Json => {
            let value = serde_json::to_value(&outcome)
                .unwrap_or_else(|e| serde_json::json!({ "error": format!("serialization: {}", e) }));
            print_json(&value);
        }
    }
}
