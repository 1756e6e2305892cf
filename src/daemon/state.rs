//! Monitor state: tracked live flags, cached names, and configuration.

use crate::common::names::NameCache;
use crate::common::types::{RoomInfo, TransitionKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default time between poll cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Live/offline flag per configured room
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    live: HashMap<String, bool>,
}

impl StatusTracker {
    /// Every room starts offline
    pub fn new(room_ids: &[String]) -> Self {
        Self {
            live: room_ids.iter().map(|id| (id.clone(), false)).collect(),
        }
    }

    /// Compare a freshly resolved flag with the stored one and store it.
    ///
    /// Call once per room per cycle. Unknown rooms are left untracked.
    pub fn update(&mut self, room_id: &str, resolved_live: bool) -> TransitionKind {
        let Some(stored) = self.live.get_mut(room_id) else {
            warn!("Ignoring status for untracked room {}", room_id);
            return TransitionKind::Unchanged;
        };
        let kind = match (*stored, resolved_live) {
            (false, true) => TransitionKind::NewlyLive,
            (true, false) => TransitionKind::NewlyOffline,
            _ => TransitionKind::Unchanged,
        };
        *stored = resolved_live;
        kind
    }

    #[cfg(test)]
    pub fn is_live(&self, room_id: &str) -> Option<bool> {
        self.live.get(room_id).copied()
    }
}

/// Settings fixed for the lifetime of a run
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub room_ids: Vec<String>,
    pub interval: Duration,
    /// Offer to open newly live rooms in the browser
    pub auto_open: bool,
    /// Push-relay key; `None` disables relay pushes
    pub push_key: Option<String>,
}

impl MonitorConfig {
    pub fn new(room_ids: Vec<String>) -> Self {
        Self {
            room_ids,
            interval: DEFAULT_INTERVAL,
            auto_open: true,
            push_key: None,
        }
    }
}

/// Process-wide monitor context, built once at startup
pub struct MonitorContext {
    pub config: MonitorConfig,
    pub status: StatusTracker,
    pub names: NameCache,
    /// Where `names` is written back; `None` keeps the cache in memory only
    pub names_path: Option<PathBuf>,
}

impl MonitorContext {
    pub fn new(config: MonitorConfig, names: NameCache, names_path: Option<PathBuf>) -> Self {
        let status = StatusTracker::new(&config.room_ids);
        Self {
            config,
            status,
            names,
            names_path,
        }
    }

    /// Learn names from a resolution, saving write-through when they changed
    pub fn remember_names(&mut self, info: &RoomInfo) {
        if self.names.remember(info) {
            if let Some(path) = &self.names_path {
                self.names.save(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::InfoSource;
    use tempfile::tempdir;

    fn rooms(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tracker_starts_offline() {
        let tracker = StatusTracker::new(&rooms(&["a", "b"]));
        assert_eq!(tracker.is_live("a"), Some(false));
        assert_eq!(tracker.is_live("b"), Some(false));
    }

    #[test]
    fn test_newly_live_then_unchanged() {
        let mut tracker = StatusTracker::new(&rooms(&["a"]));
        assert_eq!(tracker.update("a", true), TransitionKind::NewlyLive);
        assert_eq!(tracker.is_live("a"), Some(true));
        assert_eq!(tracker.update("a", true), TransitionKind::Unchanged);
    }

    #[test]
    fn test_newly_offline() {
        let mut tracker = StatusTracker::new(&rooms(&["a"]));
        tracker.update("a", true);
        assert_eq!(tracker.update("a", false), TransitionKind::NewlyOffline);
        assert_eq!(tracker.update("a", false), TransitionKind::Unchanged);
    }

    #[test]
    fn test_unknown_room_is_not_tracked() {
        let mut tracker = StatusTracker::new(&rooms(&["a"]));
        assert_eq!(tracker.update("zzz", true), TransitionKind::Unchanged);
        assert_eq!(tracker.is_live("zzz"), None);
        assert_eq!(tracker.is_live("a"), Some(false));
    }

    #[test]
    fn test_remember_names_writes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("room_names.json");
        let mut ctx = MonitorContext::new(
            MonitorConfig::new(rooms(&["a"])),
            NameCache::new(),
            Some(path.clone()),
        );
        ctx.remember_names(&RoomInfo {
            room_id: "a".to_string(),
            room_name: "Room".to_string(),
            owner_name: "Owner".to_string(),
            live: true,
            source: InfoSource::OpenApi,
        });

        let reloaded = NameCache::load(&path);
        assert_eq!(reloaded.get("a").unwrap().owner_name, "Owner");
    }
}
