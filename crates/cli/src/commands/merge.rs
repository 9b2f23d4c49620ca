use std::path::Path;

use tagex_core::{merge, ConflictResolution, ParseOptions};

use super::parse_or_exit;
use crate::{fail, print_json, MergeMode, OutputFormat};

pub(crate) fn cmd_merge(a: &Path, b: &Path, mode: MergeMode, output: OutputFormat, quiet: bool) {
    let first = parse_or_exit(a, ParseOptions::new(), output, quiet);
    let second = parse_or_exit(b, ParseOptions::new(), output, quiet);
    let mode = match mode {
        MergeMode::Union => ConflictResolution::Union,
        MergeMode::Override => ConflictResolution::Override,
    };

    let merged = match merge(&first, &second, mode) {
        Ok(m) => m,
        Err(e) => fail(&format!("merge error: {}", e), output, quiet),
    };

    match output {
        OutputFormat::Text => print!("{}", merged.to_text()),
        OutputFormat::Json => print_json(&serde_json::json!({
            "mode": mode.as_str(),
            "expectations": merged.expectations.iter().map(|e| e.to_line()).collect::<Vec<_>>(),
            "text": merged.to_text(),
        })),
    }
}
