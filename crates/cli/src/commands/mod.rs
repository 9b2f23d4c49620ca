mod broken;
mod check;
mod merge;
mod narrow;
mod orphans;
mod query;
mod recent;
mod remove;

pub(crate) use broken::cmd_broken;
pub(crate) use check::cmd_check;
pub(crate) use merge::cmd_merge;
pub(crate) use narrow::cmd_narrow;
pub(crate) use orphans::cmd_orphans;
pub(crate) use query::cmd_query;
pub(crate) use recent::cmd_recent;
pub(crate) use remove::cmd_remove;

use std::path::Path;

use tagex_core::{ExpectationFile, ExpectationsError, ParseOptions};

use crate::{fail, OutputFormat};

/// Read `path` or exit with a diagnostic.
pub(crate) fn read_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(
            &format!("error reading file '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    }
}

/// Parse and conflict-check `path`, or exit after printing the diagnostic.
pub(crate) fn parse_or_exit(
    path: &Path,
    options: ParseOptions<'_>,
    output: OutputFormat,
    quiet: bool,
) -> ExpectationFile {
    let text = read_or_exit(path, output, quiet);
    let options = options.filename(path.display().to_string());
    match tagex_core::parse(&text, &options) {
        Ok(file) => file,
        Err(e) => exit_with_parse_error(&e, output, quiet),
    }
}

pub(crate) fn exit_with_parse_error(e: &ExpectationsError, output: OutputFormat, quiet: bool) -> ! {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("{}", e);
            }
        }
    }
    std::process::exit(1);
}
