//! Notification delivery: platform-native desktop alerts plus an optional
//! ServerChan push relay.
//!
//! The two channels are independent. A failure on one is logged and never
//! prevents the other from being tried.

use crate::common::http::HttpClient;
use crate::common::types::{TransitionEvent, TransitionKind};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

pub const APP_NAME: &str = "Douyu Live Alerts";
pub const DISPLAY_TIMEOUT: Duration = Duration::from_secs(10);

const LIVE_MARKER: &str = "🔴";
const OFFLINE_MARKER: &str = "⚪";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("could not run {program}: {reason}")]
    Spawn { program: &'static str, reason: String },

    #[error("{program} exited with {status}")]
    Exit { program: &'static str, status: String },

    #[error("no desktop notifier on this platform")]
    Unsupported,

    #[error("push relay failed: {0}")]
    Relay(String),
}

/// Local desktop notification sink
pub trait DesktopNotifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Desktop notifier backed by the platform's notification command
pub struct CommandNotifier {
    app_name: String,
    timeout: Duration,
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            timeout: DISPLAY_TIMEOUT,
        }
    }
}

impl DesktopNotifier for CommandNotifier {
    #[allow(unreachable_code)]
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        #[cfg(target_os = "macos")]
        {
            return self.notify_macos(title, body);
        }

        #[cfg(target_os = "linux")]
        {
            return self.notify_linux(title, body);
        }

        let _ = (title, body, &self.app_name, self.timeout);
        Err(NotifyError::Unsupported)
    }
}

impl CommandNotifier {
    /// macOS notification using osascript (no display timeout control)
    #[cfg(target_os = "macos")]
    fn notify_macos(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let script = format!(
            "display notification \"{}\" with title \"{}\" subtitle \"{}\"",
            body.replace('"', "\\\""),
            self.app_name.replace('"', "\\\""),
            title.replace('"', "\\\"")
        );
        run_notifier("osascript", &["-e", &script])
    }

    /// Linux notification using notify-send
    #[cfg(target_os = "linux")]
    fn notify_linux(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let timeout_ms = self.timeout.as_millis().to_string();
        run_notifier(
            "notify-send",
            &["-a", &self.app_name, "-t", &timeout_ms, title, body],
        )
    }
}

#[allow(dead_code)]
fn run_notifier(program: &'static str, args: &[&str]) -> Result<(), NotifyError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| NotifyError::Spawn {
            program,
            reason: e.to_string(),
        })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(NotifyError::Exit {
            program,
            status: output.status.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// ServerChan webhook forwarding a title/description pair to the user's phone
pub struct PushRelay {
    key: String,
    http: Arc<dyn HttpClient>,
}

impl PushRelay {
    pub fn new(key: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            key: key.into(),
            http,
        }
    }

    fn url(&self) -> String {
        format!("https://sctapi.ftqq.com/{}.send", self.key)
    }

    /// Push one message. The relay renders Markdown, so single newlines are doubled.
    pub fn push(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let desp = body.replace('\n', "\n\n");
        let fetched = self
            .http
            .post_form(&self.url(), &[("title", title), ("desp", desp.as_str())])
            .map_err(|e| NotifyError::Relay(e.to_string()))?;
        if !fetched.is_ok() {
            return Err(NotifyError::Relay(format!("HTTP status {}", fetched.status)));
        }

        let response: RelayResponse = serde_json::from_str(&fetched.body)
            .map_err(|e| NotifyError::Relay(format!("invalid response: {}", e)))?;
        match response.code {
            Some(0) => Ok(()),
            code => Err(NotifyError::Relay(response.message.unwrap_or_else(|| {
                format!("code {}", code.map_or("missing".to_string(), |c| c.to_string()))
            }))),
        }
    }
}

/// What happened to each channel for one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub local_ok: bool,
    /// `None` when no relay is configured
    pub relay_ok: Option<bool>,
}

pub struct NotificationDispatcher {
    desktop: Box<dyn DesktopNotifier>,
    relay: Option<PushRelay>,
}

impl NotificationDispatcher {
    pub fn new(desktop: Box<dyn DesktopNotifier>, relay: Option<PushRelay>) -> Self {
        Self { desktop, relay }
    }

    /// Deliver through every channel. Never fails; outcomes are logged and reported.
    pub fn dispatch(&self, title: &str, body: &str) -> DispatchReport {
        let log_title = title
            .replace(LIVE_MARKER, "[LIVE]")
            .replace(OFFLINE_MARKER, "[OFFLINE]");

        let local_ok = match self.desktop.notify(title, body) {
            Ok(()) => {
                info!("Notified: {} - {}", log_title, body.replace('\n', " | "));
                true
            }
            Err(e) => {
                error!("Desktop notification failed: {}", e);
                false
            }
        };

        let relay_ok = self.relay.as_ref().map(|relay| match relay.push(title, body) {
            Ok(()) => {
                info!("Push relay delivered: {}", log_title);
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        });

        DispatchReport { local_ok, relay_ok }
    }
}

/// Title and body for a transition, `None` for [`TransitionKind::Unchanged`]
pub fn render_transition(event: &TransitionEvent, at: DateTime<Local>) -> Option<(String, String)> {
    let owner = &event.room_info.owner_name;
    let title = match event.kind {
        TransitionKind::NewlyLive => format!("{} {} started streaming", LIVE_MARKER, owner),
        TransitionKind::NewlyOffline => format!("{} {} stopped streaming", OFFLINE_MARKER, owner),
        TransitionKind::Unchanged => return None,
    };
    let body = format!(
        "Room: {}\nTime: {}",
        event.room_info.room_name,
        at.format(TIMESTAMP_FORMAT)
    );
    Some((title, body))
}

#[cfg(test)]
pub mod testing {
    //! Recording desktop notifier for tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub fail: bool,
        pub sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl DesktopNotifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            if self.fail {
                Err(NotifyError::Spawn {
                    program: "notify-send",
                    reason: "not installed".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}
