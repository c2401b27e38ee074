//! JSON file helpers shared by the file-backed settings and archive stores.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, WrangleError};

/// Atomic write: serialize to a sibling temp file, then rename into place.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(|source| WrangleError::Storage {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state.json".into());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let json = serde_json::to_string_pretty(value).map_err(|source| {
        WrangleError::Serialization {
            path: path.to_path_buf(),
            source,
        }
    })?;
    std::fs::write(&tmp_path, json).map_err(|source| WrangleError::Storage {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| WrangleError::Storage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Read and parse a JSON file. Returns `None` if the file doesn't exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path).map_err(|source| WrangleError::Storage {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_str(&json).map_err(|source| WrangleError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn write_then_read_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut value = BTreeMap::new();
        value.insert("paused".to_string(), true);
        write_json_atomic(&path, &value).unwrap();

        let loaded: BTreeMap<String, bool> = read_json(&path).unwrap().unwrap();
        assert_eq!(loaded, value);
        assert!(!path.with_file_name(".state.json.tmp").exists());
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<BTreeMap<String, bool>> =
            read_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn read_malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = read_json::<BTreeMap<String, bool>>(&path).unwrap_err();
        assert!(matches!(err, WrangleError::Serialization { .. }));
    }
}
