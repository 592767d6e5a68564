//! Minimal `.env.local` reader.
//!
//! Values are collected into a map instead of being written into the process
//! environment; variables already present in the real environment win.

use std::{io::ErrorKind, path::Path};

use config::Map;

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped, the
/// value is everything after the first `=`, and one layer of matching
/// single or double quotes is stripped.
pub fn parse_env_file(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }

            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }

            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Read `path` if it exists. A missing file yields an empty list.
pub fn read_env_file(path: &Path) -> std::io::Result<Vec<(String, String)>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(parse_env_file(&contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

/// Merge file entries under the given process variables.
pub fn layered_environment(
    file_entries: Vec<(String, String)>,
    process: impl IntoIterator<Item = (String, String)>,
) -> Map<String, String> {
    let mut merged = Map::new();
    for (key, value) in file_entries {
        merged.insert(key, value);
    }
    for (key, value) in process {
        merged.insert(key, value);
    }
    merged
}
