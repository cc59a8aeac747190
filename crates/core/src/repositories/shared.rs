//! Helpers shared by the record repositories.

use crate::model::parse_yaml;
use crate::{RecordError, RecordResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Find every `<root>/<s1>/<s2>/<id>/<file_name>` file.
///
/// A missing root yields nothing. Unreadable directories are skipped.
pub(crate) fn sharded_files(root: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let s1_iter = match fs::read_dir(root) {
        Ok(it) => it,
        Err(_) => return found,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };
        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for id_ent in id_iter.flatten() {
                let file_path = id_ent.path().join(file_name);
                if file_path.is_file() {
                    found.push(file_path);
                }
            }
        }
    }

    found
}

/// Parse every record under `root`, logging and skipping files that do not parse.
pub(crate) fn load_all<T: DeserializeOwned>(root: &Path, file_name: &str) -> Vec<T> {
    let mut records = Vec::new();
    for path in sharded_files(root, file_name) {
        match read_record::<T>(&path) {
            Ok(Some((record, _))) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("failed to load {}: {}", path.display(), e);
            }
        }
    }
    records
}

/// Read and parse one record file, returning the raw text alongside for rollback.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_record<T: DeserializeOwned>(path: &Path) -> RecordResult<Option<(T, String)>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RecordError::FileRead(e)),
    };
    let record = parse_yaml(&contents)?;
    Ok(Some((record, contents)))
}

pub(crate) fn to_yaml<T: Serialize>(record: &T) -> RecordResult<String> {
    serde_yaml::to_string(record).map_err(RecordError::YamlSerialization)
}
