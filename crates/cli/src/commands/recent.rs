use std::path::Path;

use tagex_finder::{recent_content, today, GitBlame};

use crate::{fail, print_json, OutputFormat};

pub(crate) fn cmd_recent(file: &Path, grace_period_days: i64, output: OutputFormat, quiet: bool) {
    let view = match recent_content(file, grace_period_days, &GitBlame::new(), today()) {
        Ok(v) => v,
        Err(e) => fail(&e.to_string(), output, quiet),
    };
    match output {
        OutputFormat::Text => print!("{}", view),
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "grace_period_days": grace_period_days,
            "content": view,
        })),
    }
}
