use std::path::Path;

use tagex_core::{expectations_for, Expectation, ParseOptions};

use super::parse_or_exit;
use crate::{print_json, OutputFormat};

pub(crate) fn cmd_query(
    file: &Path,
    tags: &[String],
    ignored_tags: &[String],
    tests: &[String],
    output: OutputFormat,
    quiet: bool,
) {
    let options = ParseOptions::new()
        .tags(tags.iter().cloned())
        .ignored_tags(ignored_tags.iter().cloned());
    let parsed = parse_or_exit(file, options, output, quiet);

    let resolved: Vec<Expectation> = tests
        .iter()
        .map(|test| expectations_for(&parsed, test))
        .collect();

    match output {
        OutputFormat::Text => {
            for e in &resolved {
                let results: Vec<&str> = e.all_results().into_iter().map(|r| r.as_str()).collect();
                let mut line = format!("{}: {}", e.test.as_str(), results.join(" "));
                if !e.reason.is_empty() {
                    line.push_str(&format!(" ({})", e.reason_string()));
                }
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = resolved
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "test": e.test.as_str(),
                        "results": e.all_results().into_iter().map(|r| r.as_str()).collect::<Vec<_>>(),
                        "reason": e.reason,
                        "tags": e.tags,
                        "default": e.is_default_pass,
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(entries));
        }
    }
}
