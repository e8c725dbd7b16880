//! Telemetry: logging setup and per-link counters

mod logging;
mod metrics;

pub use logging::{init_logging, is_known_level, parse_level, LogConfig, LogFormat};
pub use metrics::{Counter, LinkStats};
