//! Last-known room and owner names, the final fallback when every lookup fails.

use crate::common::persistence::write_json;
use crate::common::types::{placeholder_owner_name, placeholder_room_name, RoomInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, warn};

/// Names remembered for one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedNames {
    pub room_name: String,
    pub owner_name: String,
}

/// On-disk entry. Older files stored one composite name per room.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredNames {
    Pair(CachedNames),
    Composite(String),
}

impl From<StoredNames> for CachedNames {
    fn from(stored: StoredNames) -> Self {
        match stored {
            StoredNames::Pair(names) => names,
            StoredNames::Composite(name) => CachedNames {
                room_name: name.clone(),
                owner_name: name,
            },
        }
    }
}

impl CachedNames {
    /// Trim both names and swap a blank one for its placeholder.
    /// `None` when neither name is usable.
    fn normalized(self, room_id: &str) -> Option<Self> {
        let room_name = self.room_name.trim();
        let owner_name = self.owner_name.trim();
        if room_name.is_empty() && owner_name.is_empty() {
            return None;
        }
        Some(Self {
            room_name: usable_or(room_name, || placeholder_room_name(room_id)),
            owner_name: usable_or(owner_name, || placeholder_owner_name(room_id)),
        })
    }
}

fn usable_or(name: &str, placeholder: impl FnOnce() -> String) -> String {
    let name = name.trim();
    if name.is_empty() {
        placeholder()
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCache {
    entries: HashMap<String, CachedNames>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from disk. Missing, unreadable or corrupt files give an empty cache.
    ///
    /// Blank names are replaced by placeholders; entries with no usable name are dropped.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::new(),
            Err(e) => {
                warn!("Cannot read name cache {}, starting empty: {}", path.display(), e);
                return Self::new();
            }
        };
        match serde_json::from_str::<HashMap<String, StoredNames>>(&content) {
            Ok(stored) => Self {
                entries: stored
                    .into_iter()
                    .filter_map(|(id, s)| {
                        let names = CachedNames::from(s).normalized(&id)?;
                        Some((id, names))
                    })
                    .collect(),
            },
            Err(e) => {
                warn!("Name cache {} is corrupt, starting empty: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Save to disk. Failures are logged, never propagated.
    pub fn save(&self, path: &Path) {
        if let Err(e) = write_json(path, &self.entries) {
            error!("Failed to save name cache: {:#}", e);
        }
    }

    pub fn get(&self, room_id: &str) -> Option<&CachedNames> {
        self.entries.get(room_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached room name, else a placeholder. Never blank.
    pub fn room_name_or_placeholder(&self, room_id: &str) -> String {
        let cached = self.get(room_id).map_or("", |n| n.room_name.as_str());
        usable_or(cached, || placeholder_room_name(room_id))
    }

    /// Cached owner name, else a placeholder. Never blank.
    pub fn owner_name_or_placeholder(&self, room_id: &str) -> String {
        let cached = self.get(room_id).map_or("", |n| n.owner_name.as_str());
        usable_or(cached, || placeholder_owner_name(room_id))
    }

    /// Learn names from a resolved room. Placeholders never replace real names.
    ///
    /// Returns true if the cache changed and should be saved.
    pub fn remember(&mut self, info: &RoomInfo) -> bool {
        let room_name = Some(info.room_name.trim())
            .filter(|n| !n.is_empty() && *n != placeholder_room_name(&info.room_id));
        let owner_name = Some(info.owner_name.trim())
            .filter(|n| !n.is_empty() && *n != placeholder_owner_name(&info.room_id));

        if room_name.is_none() && owner_name.is_none() {
            return false;
        }

        let merged = match self.entries.get(&info.room_id) {
            Some(existing) => CachedNames {
                room_name: room_name.map_or_else(|| existing.room_name.clone(), str::to_string),
                owner_name: owner_name
                    .map_or_else(|| existing.owner_name.clone(), str::to_string),
            },
            None => CachedNames {
                room_name: room_name
                    .map_or_else(|| placeholder_room_name(&info.room_id), str::to_string),
                owner_name: owner_name
                    .map_or_else(|| placeholder_owner_name(&info.room_id), str::to_string),
            },
        };

        if self.entries.get(&info.room_id) == Some(&merged) {
            return false;
        }
        self.entries.insert(info.room_id.clone(), merged);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::InfoSource;
    use tempfile::tempdir;

    fn info(room_id: &str, room_name: &str, owner_name: &str) -> RoomInfo {
        RoomInfo {
            room_id: room_id.to_string(),
            room_name: room_name.to_string(),
            owner_name: owner_name.to_string(),
            live: false,
            source: InfoSource::OpenApi,
        }
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room_names.json");
        let mut cache = NameCache::new();
        cache.remember(&info("1", "Morning show", "Alice"));
        cache.remember(&info("2", "Speedruns", "Bob"));
        cache.save(&path);

        assert_eq!(NameCache::load(&path), cache);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(NameCache::load(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room_names.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(NameCache::load(&path).is_empty());
    }

    #[test]
    fn test_load_accepts_composite_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room_names.json");
        fs::write(
            &path,
            r#"{"1": "Old name", "2": {"room_name": "R", "owner_name": "O"}}"#,
        )
        .unwrap();
        let cache = NameCache::load(&path);
        assert_eq!(cache.get("1").unwrap().owner_name, "Old name");
        assert_eq!(cache.get("1").unwrap().room_name, "Old name");
        assert_eq!(cache.get("2").unwrap().owner_name, "O");
    }

    #[test]
    fn test_placeholder_never_overwrites_real_name() {
        let mut cache = NameCache::new();
        assert!(cache.remember(&info("7", "Real room", "Real owner")));
        let placeholder = info("7", &placeholder_room_name("7"), &placeholder_owner_name("7"));
        assert!(!cache.remember(&placeholder));
        assert_eq!(cache.get("7").unwrap().room_name, "Real room");
        assert_eq!(cache.get("7").unwrap().owner_name, "Real owner");
    }

    #[test]
    fn test_partial_names_merge() {
        let mut cache = NameCache::new();
        cache.remember(&info("7", "Real room", "Real owner"));
        assert!(cache.remember(&info("7", "New title", &placeholder_owner_name("7"))));
        assert_eq!(cache.get("7").unwrap().room_name, "New title");
        assert_eq!(cache.get("7").unwrap().owner_name, "Real owner");
    }

    #[test]
    fn test_remember_unchanged_reports_false() {
        let mut cache = NameCache::new();
        assert!(cache.remember(&info("7", "Room", "Owner")));
        assert!(!cache.remember(&info("7", "Room", "Owner")));
    }

    #[test]
    fn test_fallback_names() {
        let mut cache = NameCache::new();
        assert_eq!(cache.room_name_or_placeholder("5"), placeholder_room_name("5"));
        cache.remember(&info("5", "Room", "Owner"));
        assert_eq!(cache.owner_name_or_placeholder("5"), "Owner");
    }

    #[test]
    fn test_load_replaces_blank_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room_names.json");
        fs::write(
            &path,
            r#"{"63136": "", "7": {"room_name": "", "owner_name": " "}, "8": {"room_name": " Room ", "owner_name": ""}}"#,
        )
        .unwrap();
        let cache = NameCache::load(&path);

        assert!(cache.get("63136").is_none());
        assert!(cache.get("7").is_none());
        assert_eq!(cache.get("8").unwrap().room_name, "Room");
        assert_eq!(cache.get("8").unwrap().owner_name, placeholder_owner_name("8"));
        assert_eq!(cache.room_name_or_placeholder("63136"), placeholder_room_name("63136"));
        assert_eq!(cache.owner_name_or_placeholder("7"), placeholder_owner_name("7"));
    }

    #[test]
    fn test_unreadable_file_is_empty() {
        let dir = tempdir().unwrap();
        // Reading a directory fails with something other than NotFound
        assert!(NameCache::load(dir.path()).is_empty());
    }
}
