//! Core types used throughout the application.

use std::fmt;

/// Resolved snapshot of a Douyu room.
///
/// Always complete: names are never empty, falling back to the cache or to
/// placeholders derived from the room id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: String,
    pub room_name: String,
    pub owner_name: String,
    pub live: bool,
    pub source: InfoSource,
}

/// Which lookup produced a [`RoomInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoSource {
    /// Official open-platform room endpoint
    OpenApi,
    /// Scraped mobile room page
    MobilePage,
    /// Mobile page redirected to a campaign/topic page
    TopicRedirect,
    /// PC `betard` endpoint
    Betard,
    /// Every network source failed
    Cache,
}

impl fmt::Display for InfoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoSource::OpenApi => write!(f, "open api"),
            InfoSource::MobilePage => write!(f, "mobile page"),
            InfoSource::TopicRedirect => write!(f, "topic redirect"),
            InfoSource::Betard => write!(f, "betard api"),
            InfoSource::Cache => write!(f, "cache"),
        }
    }
}

/// Outcome of comparing a fresh status with the tracked one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Unchanged,
    NewlyLive,
    NewlyOffline,
}

/// A detected live/offline change for one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub room_id: String,
    pub room_info: RoomInfo,
    pub kind: TransitionKind,
}

/// A room that went live this cycle, waiting for the selection handler
pub type LiveRoom = (String, RoomInfo);

/// Placeholder room name used when nothing better is known
pub fn placeholder_room_name(room_id: &str) -> String {
    format!("Unknown room {}", room_id)
}

/// Placeholder owner name used when nothing better is known
pub fn placeholder_owner_name(room_id: &str) -> String {
    format!("Unknown streamer {}", room_id)
}

/// Web URL of a room, for opening in a browser
pub fn room_url(room_id: &str) -> String {
    format!("https://www.douyu.com/{}", room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_mention_room_id() {
        assert_eq!(placeholder_room_name("63136"), "Unknown room 63136");
        assert_eq!(placeholder_owner_name("63136"), "Unknown streamer 63136");
    }

    #[test]
    fn test_room_url() {
        assert_eq!(room_url("6979222"), "https://www.douyu.com/6979222");
    }
}
