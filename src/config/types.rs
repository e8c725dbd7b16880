//! Configuration types

use crate::link::{LinkConfig, TunnelConfig};
use crate::telemetry::LogConfig;
use serde::Deserialize;
use std::time::Duration;

/// User-defined configuration (pppos.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub timers: TimerConfig,
    pub transport: TransportConfig,
    #[serde(default)]
    pub tunnel: Option<TunnelConfig>,
    #[serde(default)]
    pub logging: LogConfig,
}

/// PAP credentials
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub restart_ms: u64,
    pub max_configure: u8,
    pub max_terminate: u8,
    pub pap_retries: u8,
    /// Zero disables LCP echo keepalives
    pub echo_interval_secs: u64,
    pub echo_failures: u8,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            restart_ms: 3000,
            max_configure: 10,
            max_terminate: 3,
            pap_retries: 3,
            echo_interval_secs: 30,
            echo_failures: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Whole PPP frames carried in UDP datagrams
    #[default]
    Udp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    /// Local socket address
    pub bind: String,
    /// Remote socket address
    pub peer: String,
}

impl Config {
    /// Link parameters for the engine
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
            restart: Duration::from_millis(self.timers.restart_ms),
            max_configure: self.timers.max_configure,
            max_terminate: self.timers.max_terminate,
            pap_retries: self.timers.pap_retries,
            echo_interval: Duration::from_secs(self.timers.echo_interval_secs),
            echo_failures: self.timers.echo_failures,
            tunnel: self.tunnel.clone(),
        }
    }
}
