//! Backend access: the HTTP client and the payload adapter behind it.

mod client;
mod wire;

pub use client::{ApiClient, SessionUpdate};
pub use wire::TodayStats;
