//! The poll loop: resolve every room, diff against tracked state, notify, sleep.

use crate::common::types::{LiveRoom, TransitionEvent, TransitionKind};
use crate::daemon::notifier::{render_transition, NotificationDispatcher};
use crate::daemon::selection::SelectionHandler;
use crate::daemon::state::MonitorContext;
use crate::resolver::RoomInfoResolver;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Granularity of interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(100);

pub struct PollLoop<'a> {
    ctx: &'a mut MonitorContext,
    resolver: RoomInfoResolver,
    dispatcher: NotificationDispatcher,
    selector: Option<Box<dyn SelectionHandler>>,
    /// Rooms that went live during the current cycle
    pending: Vec<LiveRoom>,
}

impl<'a> PollLoop<'a> {
    pub fn new(
        ctx: &'a mut MonitorContext,
        resolver: RoomInfoResolver,
        dispatcher: NotificationDispatcher,
        selector: Option<Box<dyn SelectionHandler>>,
    ) -> Self {
        Self {
            ctx,
            resolver,
            dispatcher,
            selector,
            pending: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[LiveRoom] {
        &self.pending
    }

    #[cfg(test)]
    pub fn context(&self) -> &MonitorContext {
        &*self.ctx
    }

    /// Resolve one room and act on any transition
    pub fn poll_room(&mut self, room_id: &str) -> Option<TransitionEvent> {
        let room_info = self.resolver.resolve(room_id, &self.ctx.names);
        self.ctx.remember_names(&room_info);

        let kind = self.ctx.status.update(room_id, room_info.live);
        if kind == TransitionKind::Unchanged {
            info!(
                "Room {}({}) status: {}",
                room_info.room_name,
                room_id,
                if room_info.live { "live" } else { "offline" }
            );
            return None;
        }

        let event = TransitionEvent {
            room_id: room_id.to_string(),
            room_info,
            kind,
        };
        if let Some((title, body)) = render_transition(&event, Local::now()) {
            let report = self.dispatcher.dispatch(&title, &body);
            if !report.local_ok && report.relay_ok != Some(true) {
                warn!("No channel delivered the alert for room {}", room_id);
            }
        }

        let owner = &event.room_info.owner_name;
        match kind {
            TransitionKind::NewlyLive => {
                info!("{}({}) went live", owner, room_id);
                self.pending
                    .push((event.room_id.clone(), event.room_info.clone()));
            }
            TransitionKind::NewlyOffline => info!("{}({}) went offline", owner, room_id),
            TransitionKind::Unchanged => {}
        }
        Some(event)
    }

    /// Poll every configured room once, stopping early if `running` drops
    pub fn poll_rooms(&mut self, running: &AtomicBool) -> Vec<TransitionEvent> {
        let room_ids = self.ctx.config.room_ids.clone();
        let mut events = Vec::new();
        for room_id in &room_ids {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            events.extend(self.poll_room(room_id));
        }
        events
    }

    /// Snapshot the pending rooms, clear the list, and pass the snapshot on
    pub fn hand_off_selection(&mut self) {
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return;
        }
        if let Some(selector) = &self.selector {
            selector.offer(batch);
        }
    }

    /// One full cycle: poll everything, then hand newly live rooms to the selector
    pub fn run_cycle(&mut self, running: &AtomicBool) -> Vec<TransitionEvent> {
        let events = self.poll_rooms(running);
        self.hand_off_selection();
        events
    }

    /// Poll until `running` is cleared
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Monitoring rooms: {} (every {}s)",
            self.ctx.config.room_ids.join(", "),
            self.ctx.config.interval.as_secs()
        );
        while running.load(Ordering::SeqCst) {
            self.run_cycle(running);
            sleep_while_running(self.ctx.config.interval, running);
        }
        info!("Monitoring stopped");
    }
}

/// Sleep for `duration`, waking early once `running` is cleared
fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
