use std::path::Path;

use tagex_core::{check_for_broken_expectations, ParseOptions};

use super::{parse_or_exit, read_or_exit};
use crate::{print_json, OutputFormat};

pub(crate) fn cmd_broken(file: &Path, tests_file: &Path, output: OutputFormat, quiet: bool) {
    let parsed = parse_or_exit(file, ParseOptions::new(), output, quiet);
    let listing = read_or_exit(tests_file, output, quiet);
    let tests = listing.lines().map(str::trim).filter(|t| !t.is_empty());

    let broken = check_for_broken_expectations(&parsed, tests);
    tracing::debug!(broken = broken.len(), "checked for broken expectations");

    match output {
        OutputFormat::Text => {
            for e in &broken {
                println!("{}:{}: {}", file.display(), e.line_number.unwrap_or(0), e);
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = broken
                .iter()
                .map(|e| serde_json::json!({ "line": e.line_number, "expectation": e.to_line() }))
                .collect();
            print_json(&serde_json::Value::Array(entries));
        }
    }
}
