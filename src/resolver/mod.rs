//! Room status resolution.
//!
//! Douyu's endpoints are undocumented and flaky, so a room is looked up through
//! an ordered chain of sources: the open-platform API, the mobile room page,
//! the PC `betard` endpoint, and finally the name cache. The first source that
//! produces a complete [`RoomInfo`] wins. [`RoomInfoResolver::resolve`] never
//! fails.

pub mod scrape;

use crate::common::http::{FetchError, HttpClient};
use crate::common::names::NameCache;
use crate::common::types::{InfoSource, RoomInfo};
use scrape::PageScanner;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API rejected the request: {0}")]
    Rejected(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

pub fn open_api_url(room_id: &str) -> String {
    format!("https://open.douyu.com/api/RoomApi/room/{}", room_id)
}

pub fn mobile_page_url(room_id: &str) -> String {
    format!("https://m.douyu.com/{}", room_id)
}

pub fn betard_url(room_id: &str) -> String {
    format!("https://www.douyu.com/betard/{}", room_id)
}

#[derive(Debug, Deserialize)]
struct OpenApiResponse {
    #[serde(default)]
    error: Value,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct OpenApiRoom {
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    owner_name: Option<String>,
    #[serde(default)]
    room_status: Value,
}

#[derive(Debug, Deserialize)]
struct BetardResponse {
    #[serde(default)]
    room: Option<BetardRoom>,
}

#[derive(Debug, Deserialize)]
struct BetardRoom {
    #[serde(default)]
    room_id: Value,
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    owner_name: Option<String>,
    #[serde(default)]
    show_status: Value,
}

/// `1` or `"1"` means live; the endpoints disagree on the type
fn is_live_flag(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        Value::Bool(b) => *b,
        _ => false,
    }
}

/// Betard only reports live as the integer `1`
fn is_betard_live(value: &Value) -> bool {
    value.as_i64() == Some(1)
}

fn is_present_id(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_i64().map_or(true, |id| id != 0),
        Value::String(s) => !s.trim().is_empty(),
        _ => false,
    }
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

type Lookup = fn(&RoomInfoResolver, &str, &NameCache) -> Result<RoomInfo, ResolveError>;

/// Resolves rooms through the source chain
pub struct RoomInfoResolver {
    http: Arc<dyn HttpClient>,
    scanner: PageScanner,
}

impl RoomInfoResolver {
    pub fn new(http: Arc<dyn HttpClient>) -> Result<Self, regex::Error> {
        Ok(Self {
            http,
            scanner: PageScanner::new()?,
        })
    }

    /// Best-effort status of a room. Reads `names` only to fill gaps; never writes it.
    pub fn resolve(&self, room_id: &str, names: &NameCache) -> RoomInfo {
        let chain: [(InfoSource, Lookup); 3] = [
            (InfoSource::OpenApi, Self::from_open_api),
            (InfoSource::MobilePage, Self::from_mobile_page),
            (InfoSource::Betard, Self::from_betard),
        ];

        for (source, lookup) in chain {
            match lookup(self, room_id, names) {
                Ok(info) => {
                    debug!(
                        "Room {} via {}: live={} room={} owner={}",
                        room_id, info.source, info.live, info.room_name, info.owner_name
                    );
                    return info;
                }
                Err(e) => debug!("Room {} lookup via {} failed: {}", room_id, source, e),
            }
        }

        warn!("All lookups failed for room {}, using cached names", room_id);
        self.from_cache(room_id, names, InfoSource::Cache)
    }

    fn from_cache(&self, room_id: &str, names: &NameCache, source: InfoSource) -> RoomInfo {
        RoomInfo {
            room_id: room_id.to_string(),
            room_name: names.room_name_or_placeholder(room_id),
            owner_name: names.owner_name_or_placeholder(room_id),
            live: false,
            source,
        }
    }

    fn from_open_api(&self, room_id: &str, _names: &NameCache) -> Result<RoomInfo, ResolveError> {
        let fetched = self.http.get(&open_api_url(room_id))?;
        if !fetched.is_ok() {
            return Err(ResolveError::Status(fetched.status));
        }

        let response: OpenApiResponse = serde_json::from_str(&fetched.body)?;
        if response.error.as_i64() != Some(0) {
            return Err(ResolveError::Rejected(format!("error={}", response.error)));
        }

        let room: OpenApiRoom = serde_json::from_value(response.data)?;
        Ok(RoomInfo {
            room_id: room_id.to_string(),
            room_name: non_empty(room.room_name).ok_or(ResolveError::MissingField("room_name"))?,
            owner_name: non_empty(room.owner_name)
                .ok_or(ResolveError::MissingField("owner_name"))?,
            live: is_live_flag(&room.room_status),
            source: InfoSource::OpenApi,
        })
    }

    fn from_mobile_page(&self, room_id: &str, names: &NameCache) -> Result<RoomInfo, ResolveError> {
        let url = mobile_page_url(room_id);
        let fetched = self.http.get(&url)?;

        if fetched.final_url != url {
            debug!("Room {} redirected to {}", room_id, fetched.final_url);
            if fetched.final_url.contains("topic") {
                warn!("Room {} redirects to a campaign page, treating as offline", room_id);
                return Ok(self.from_cache(room_id, names, InfoSource::TopicRedirect));
            }
        }
        if !fetched.is_ok() {
            return Err(ResolveError::Status(fetched.status));
        }

        let page = self.scanner.scan(&fetched.body);
        if page.not_found {
            warn!("Room {} may not exist", room_id);
        }
        Ok(RoomInfo {
            room_id: room_id.to_string(),
            room_name: page
                .room_name
                .unwrap_or_else(|| names.room_name_or_placeholder(room_id)),
            owner_name: page
                .owner_name
                .unwrap_or_else(|| names.owner_name_or_placeholder(room_id)),
            live: page.live,
            source: InfoSource::MobilePage,
        })
    }

    fn from_betard(&self, room_id: &str, names: &NameCache) -> Result<RoomInfo, ResolveError> {
        let fetched = self.http.get(&betard_url(room_id))?;
        if !fetched.is_ok() {
            return Err(ResolveError::Status(fetched.status));
        }

        let response: BetardResponse = serde_json::from_str(&fetched.body)?;
        let room = response
            .room
            .filter(|room| is_present_id(&room.room_id))
            .ok_or(ResolveError::MissingField("room.room_id"))?;

        Ok(RoomInfo {
            room_id: room_id.to_string(),
            room_name: non_empty(room.room_name)
                .unwrap_or_else(|| names.room_name_or_placeholder(room_id)),
            owner_name: non_empty(room.owner_name)
                .unwrap_or_else(|| names.owner_name_or_placeholder(room_id)),
            live: is_betard_live(&room.show_status),
            source: InfoSource::Betard,
        })
    }
}
