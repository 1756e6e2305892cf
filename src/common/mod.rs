//! Types and utilities shared by the resolver and the monitor.

pub mod http;
pub mod logging;
pub mod names;
pub mod persistence;
pub mod types;
