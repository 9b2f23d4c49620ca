//! Bugs no expectation refers to any more.

use crate::error::FinderError;
use std::collections::BTreeSet;
use std::path::Path;

/// The bug URLs from `bug_urls` that appear nowhere in `files`.
///
/// The search is textual, so a bug mentioned only in a comment still
/// counts as referenced.
pub fn find_orphaned_bugs<P, I, S>(files: &[P], bug_urls: I) -> Result<BTreeSet<String>, FinderError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut orphaned: BTreeSet<String> = bug_urls.into_iter().map(|u| u.as_ref().to_string()).collect();
    for path in files {
        if orphaned.is_empty() {
            break;
        }
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FinderError::io(path, e))?;
        orphaned.retain(|url| !content.contains(url.as_str()));
    }
    tracing::debug!(orphaned = orphaned.len(), "searched for orphaned bugs");
    Ok(orphaned)
}
