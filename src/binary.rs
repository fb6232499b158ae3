//! Binary file discovery for attachment as child resources.
//!
//! For each identifier on a resource, the fixed wildcard patterns are
//! expanded into candidate filenames and the collection's binary root is
//! walked recursively for case-insensitive name matches.

use crate::config;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate filenames for an identifier: each pattern with `*` replaced.
pub fn candidate_names(id: &str) -> Vec<String> {
    config::FILE_PATTERNS
        .iter()
        .map(|pattern| pattern.replace('*', id))
        .collect()
}

/// Recursively finds files under `root` whose name matches `name`,
/// ignoring ASCII case. Unreadable directories are skipped.
pub fn search_files(root: &Path, name: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, name, &mut found);
    found.sort();
    found
}

fn walk(dir: &Path, name: &str, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // file_type() does not follow symlinks, so a cyclic directory link
        // under the root cannot recurse forever.
        if file_type.is_dir() {
            walk(&entry.path(), name, found);
        } else if entry
            .file_name()
            .to_str()
            .is_some_and(|file_name| file_name.eq_ignore_ascii_case(name))
        {
            found.push(entry.path());
        }
    }
}

/// Content type from the file extension; unknown extensions fall back to
/// `application/octet-stream`.
pub fn content_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            let ext = ext.to_ascii_lowercase();
            config::CONTENT_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, content_type)| *content_type)
        })
        .unwrap_or("application/octet-stream")
}
