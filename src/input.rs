//! Input discovery and file reading

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;
use tracing::debug;

use crate::error::AdvisorError;

/// Read a file as UTF-8, falling back to Windows-1252 (common for SQL
/// files created on Windows). A UTF-8 BOM is stripped.
pub fn read_file_with_encoding_fallback(path: &Path) -> Result<String, AdvisorError> {
    let bytes = std::fs::read(path).map_err(|e| AdvisorError::SqlFileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode(path, bytes)
}

fn decode(path: &Path, bytes: Vec<u8>) -> Result<String, AdvisorError> {
    match String::from_utf8(bytes) {
        Ok(s) => Ok(match s.strip_prefix('\u{FEFF}') {
            Some(stripped) => stripped.to_string(),
            None => s,
        }),
        Err(err) => {
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(AdvisorError::SqlFileReadError {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "File contains invalid characters",
                    ),
                })
            } else {
                debug!(file = %path.display(), "Decoded file as Windows-1252");
                Ok(decoded.into_owned())
            }
        }
    }
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

/// Expand CLI inputs into a sorted, de-duplicated list of SQL files.
///
/// Each input is a file, a directory (walked recursively for `*.sql`, skipping
/// `bin`/`obj` build output) or a glob pattern.
pub fn collect_sql_files(inputs: &[String]) -> Result<Vec<PathBuf>, AdvisorError> {
    let mut files = BTreeSet::new();

    for input in inputs {
        let mut matched = 0usize;
        let path = Path::new(input);

        if input.contains('*') || input.contains('?') || input.contains('[') {
            let paths = glob::glob(input).map_err(|e| AdvisorError::InvalidInputPattern {
                pattern: input.clone(),
                message: e.to_string(),
            })?;
            for entry in paths.filter_map(|p| p.ok()) {
                if entry.is_file() && is_sql_file(&entry) {
                    files.insert(entry);
                    matched += 1;
                }
            }
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if !entry.file_type().is_file() || !is_sql_file(entry_path) {
                    continue;
                }
                let in_build_output = entry_path
                    .strip_prefix(path)
                    .unwrap_or(entry_path)
                    .components()
                    .any(|c| matches!(c.as_os_str().to_str(), Some("bin") | Some("obj")));
                if !in_build_output {
                    files.insert(entry_path.to_path_buf());
                    matched += 1;
                }
            }
        } else if path.is_file() {
            files.insert(path.to_path_buf());
            matched += 1;
        }

        // An empty directory is fine; a file or pattern matching nothing is not
        if matched == 0 && !path.is_dir() {
            return Err(AdvisorError::NoInputFiles {
                input: input.clone(),
            });
        }
    }

    Ok(files.into_iter().collect())
}
