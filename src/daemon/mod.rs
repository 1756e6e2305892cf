//! Room monitoring: tracked state, polling, notifications, browser hand-off.

pub mod notifier;
pub mod poller;
pub mod selection;
pub mod state;
