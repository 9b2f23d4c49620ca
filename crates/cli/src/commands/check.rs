use std::path::Path;

use tagex_core::ParseOptions;

use super::parse_or_exit;
use crate::{print_json, OutputFormat};

pub(crate) fn cmd_check(
    file: &Path,
    tags: &[String],
    ignored_tags: &[String],
    output: OutputFormat,
    quiet: bool,
) {
    let options = ParseOptions::new()
        .tags(tags.iter().cloned())
        .ignored_tags(ignored_tags.iter().cloned());
    let parsed = parse_or_exit(file, options, output, quiet);

    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => {
            println!(
                "{}: {} expectations, {} tag sets",
                file.display(),
                parsed.expectations.len(),
                parsed.tag_sets.len()
            );
        }
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "valid": true,
                "expectations": parsed.expectations.len(),
                "tag_sets": parsed.tag_sets.len(),
                "conflict_resolution": parsed.conflict_resolution.as_str(),
                "conflicts_allowed": parsed.conflicts_allowed,
            }));
        }
    }
}
