pub mod client;
pub mod reconnect;

pub use client::{SttClient, SttEvent, SttMetrics};
pub use reconnect::Backoff;
