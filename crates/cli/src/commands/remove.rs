use std::path::Path;

use tagex_core::{parse_structure, ParseOptions};
use tagex_finder::{remove_expectations_from_file, RemovalType};

use super::read_or_exit;
use crate::{fail, print_json, OutputFormat, RemovalKind};

pub(crate) fn cmd_remove(
    file: &Path,
    expectations_file: &Path,
    kind: RemovalKind,
    output: OutputFormat,
    quiet: bool,
) {
    let listing = read_or_exit(expectations_file, output, quiet);
    let options = ParseOptions::new().filename(expectations_file.display().to_string());
    let wanted = match parse_structure(&listing, &options) {
        Ok(parsed) => parsed.expectations,
        Err(e) => fail(&e.to_string(), output, quiet),
    };

    let removal_type = match kind {
        RemovalKind::Stale => RemovalType::Stale,
        RemovalKind::Unused => RemovalType::Unused,
        RemovalKind::Narrowing => RemovalType::Narrowing,
    };
    let outcome = match remove_expectations_from_file(file, &wanted, removal_type) {
        Ok(o) => o,
        Err(e) => fail(&e.to_string(), output, quiet),
    };

    match output {
        OutputFormat::Text => {
            for url in &outcome.removed_urls {
                println!("{}", url);
            }
            if !quiet {
                for s in &outcome.suppressed {
                    eprintln!("kept line {}: {}", s.line, s.reason);
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
