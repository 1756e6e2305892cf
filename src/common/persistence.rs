//! File persistence for the monitored room list and the push-relay key.
//!
//! Loading is forgiving: a missing or corrupt file yields an empty default and a
//! warning. Writes are explicit user actions, so they report errors.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "douyu-watch";
const ROOM_IDS_FILE: &str = "room_ids.json";
const ROOM_NAMES_FILE: &str = "room_names.json";
const PUSH_KEY_FILE: &str = "server_chan.json";

/// Locations of every persisted file
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub dir: PathBuf,
}

impl ConfigPaths {
    /// Use `dir` if given, else the platform config directory
    pub fn resolve(dir: Option<PathBuf>) -> Self {
        let dir = dir
            .or_else(|| dirs::config_dir().map(|p| p.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("config"));
        Self { dir }
    }

    pub fn room_ids(&self) -> PathBuf {
        self.dir.join(ROOM_IDS_FILE)
    }

    pub fn room_names(&self) -> PathBuf {
        self.dir.join(ROOM_NAMES_FILE)
    }

    pub fn push_key(&self) -> PathBuf {
        self.dir.join(PUSH_KEY_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.join("douyu-watch.log")
    }
}

/// Read and deserialize a JSON file, `None` when it does not exist
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

/// Pretty-print `value` to `path`, creating the parent directory
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Load the monitored room ids
pub fn load_room_ids(path: &Path) -> Vec<String> {
    read_json(path).unwrap_or_default()
}

/// Save the monitored room ids
pub fn save_room_ids(path: &Path, room_ids: &[String]) -> Result<()> {
    write_json(path, room_ids)
}

/// Add ids to the list, skipping blanks and duplicates. Returns the ids actually added.
pub fn add_room_ids(room_ids: &mut Vec<String>, new_ids: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for id in new_ids {
        let id = id.trim();
        if id.is_empty() || room_ids.iter().any(|existing| existing == id) {
            continue;
        }
        room_ids.push(id.to_string());
        added.push(id.to_string());
    }
    added
}

/// Remove ids from the list. Returns the ids that were not present.
pub fn remove_room_ids(room_ids: &mut Vec<String>, to_remove: &[String]) -> Vec<String> {
    let mut missing = Vec::new();
    for id in to_remove {
        let id = id.trim();
        let before = room_ids.len();
        room_ids.retain(|existing| existing != id);
        if room_ids.len() == before {
            missing.push(id.to_string());
        }
    }
    missing
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PushKeyFile {
    #[serde(default)]
    key: Option<String>,
}

/// Load the push-relay key, if one is configured
pub fn load_push_key(path: &Path) -> Option<String> {
    read_json::<PushKeyFile>(path)
        .and_then(|f| f.key)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Save (or clear, with `None`) the push-relay key
pub fn save_push_key(path: &Path, key: Option<&str>) -> Result<()> {
    write_json(
        path,
        &PushKeyFile {
            key: key.map(str::to_string),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_room_ids_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_room_ids(&dir.path().join("room_ids.json")).is_empty());
    }

    #[test]
    fn test_room_ids_roundtrip_creates_dir() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths::resolve(Some(dir.path().join("nested")));
        save_room_ids(&paths.room_ids(), &ids(&["63136", "6979222"])).unwrap();
        assert_eq!(load_room_ids(&paths.room_ids()), ids(&["63136", "6979222"]));
    }

    #[test]
    fn test_room_ids_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room_ids.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_room_ids(&path).is_empty());
    }

    #[test]
    fn test_add_room_ids_skips_blank_and_duplicates() {
        let mut list = ids(&["1"]);
        let added = add_room_ids(&mut list, &ids(&["1", " ", "2", "2", " 3 "]));
        assert_eq!(added, ids(&["2", "3"]));
        assert_eq!(list, ids(&["1", "2", "3"]));
    }

    #[test]
    fn test_remove_room_ids_reports_missing() {
        let mut list = ids(&["1", "2"]);
        let missing = remove_room_ids(&mut list, &ids(&["2", "9"]));
        assert_eq!(missing, ids(&["9"]));
        assert_eq!(list, ids(&["1"]));
    }

    #[test]
    fn test_push_key_roundtrip_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server_chan.json");
        assert_eq!(load_push_key(&path), None);

        save_push_key(&path, Some("SCT123")).unwrap();
        assert_eq!(load_push_key(&path), Some("SCT123".to_string()));

        save_push_key(&path, None).unwrap();
        assert_eq!(load_push_key(&path), None);
    }

    #[test]
    fn test_push_key_blank_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server_chan.json");
        fs::write(&path, r#"{"key": "  "}"#).unwrap();
        assert_eq!(load_push_key(&path), None);
    }
}
