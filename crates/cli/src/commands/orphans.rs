use std::path::PathBuf;

use tagex_finder::find_orphaned_bugs;

use crate::{fail, print_json, OutputFormat};

pub(crate) fn cmd_orphans(files: &[PathBuf], bugs: &[String], output: OutputFormat, quiet: bool) {
    if files.is_empty() {
        fail(
            "no expectation files given and none configured in expectation_files",
            output,
            quiet,
        );
    }
    let orphaned = match find_orphaned_bugs(files, bugs) {
        Ok(o) => o,
        Err(e) => fail(&e.to_string(), output, quiet),
    };
    match output {
        OutputFormat::Text => {
            for url in &orphaned {
                println!("{}", url);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "orphaned": orphaned })),
    }
}
