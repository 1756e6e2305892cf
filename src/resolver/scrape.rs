//! Mobile room page scraping.
//!
//! Page layout drifts, so each field is read through an ordered list of rules.
//! The first rule whose pattern matches and whose extractor yields a value wins.

use regex::{Captures, Regex};

/// Phrases the mobile site shows for rooms that do not exist
const NOT_FOUND_MARKERS: [&str; 2] = ["房间未找到", "页面找不到"];

/// Brand suffix carried by page titles
const BRAND: &str = "斗鱼";

type Extractor = fn(&Captures) -> Option<String>;

struct Rule {
    pattern: Regex,
    extract: Extractor,
}

impl Rule {
    fn new(pattern: &str, extract: Extractor) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            extract,
        })
    }
}

/// Fields read from a mobile room page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub live: bool,
    pub room_name: Option<String>,
    pub owner_name: Option<String>,
    pub not_found: bool,
}

pub struct PageScanner {
    live_markers: Vec<Regex>,
    room_name_rules: Vec<Rule>,
    owner_name_rules: Vec<Rule>,
}

fn first_group(caps: &Captures) -> Option<String> {
    non_empty(caps.get(1)?.as_str())
}

/// `<title>ROOM-OWNER-斗鱼直播</title>`: the room name is the first segment
fn title_room(caps: &Captures) -> Option<String> {
    let (room, _) = caps.get(1)?.as_str().split_once('-')?;
    non_empty(room)
}

/// The owner is the second segment, with the brand stripped
fn title_owner(caps: &Captures) -> Option<String> {
    let owner = caps.get(1)?.as_str().split('-').nth(1)?;
    non_empty(&owner.replace(BRAND, ""))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn first_match(rules: &[Rule], html: &str) -> Option<String> {
    rules.iter().find_map(|rule| {
        rule.pattern
            .captures(html)
            .and_then(|caps| (rule.extract)(&caps))
    })
}

impl PageScanner {
    pub fn new() -> Result<Self, regex::Error> {
        let title = r"<title>(.*?)</title>";
        Ok(Self {
            live_markers: [
                r#""isLive":\s*[1-9]"#,
                r#""isLive":\s*true"#,
                r#""show_status":\s*"?1"?"#,
                r#""videoLoop":\s*0"#,
            ]
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<_, _>>()?,
            room_name_rules: vec![
                Rule::new(r#""roomName":\s*"([^"]+)""#, first_group)?,
                Rule::new(r#""room_name":\s*"([^"]+)""#, first_group)?,
                Rule::new(title, title_room)?,
            ],
            owner_name_rules: vec![
                Rule::new(r#""nickname":\s*"([^"]+)""#, first_group)?,
                Rule::new(title, title_owner)?,
            ],
        })
    }

    pub fn scan(&self, html: &str) -> PageScan {
        let not_found = NOT_FOUND_MARKERS.iter().any(|m| html.contains(m));
        let live = !not_found && self.live_markers.iter().any(|re| re.is_match(html));
        PageScan {
            live,
            room_name: first_match(&self.room_name_rules, html),
            owner_name: first_match(&self.owner_name_rules, html),
            not_found,
        }
    }
}
