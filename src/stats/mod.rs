//! Connection, session and hub statistics

pub mod metrics;

pub use metrics::{bitrate, ConnectionStats, HubStats, SessionStats};
