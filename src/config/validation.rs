//! Configuration validation

use super::Config;
use crate::telemetry::is_known_level;
use std::net::SocketAddr;

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_auth(config, &mut result);
    validate_timers(config, &mut result);
    validate_transport(config, &mut result);
    validate_logging(config, &mut result);

    result
}

fn validate_auth(config: &Config, result: &mut ValidationResult) {
    if config.auth.username.is_empty() {
        result.error("auth.username: must not be empty");
    }
    if config.auth.password.is_empty() {
        result.warn("auth.password: empty password");
    }
}

fn validate_timers(config: &Config, result: &mut ValidationResult) {
    let timers = &config.timers;

    if timers.restart_ms == 0 {
        result.error("timers.restart_ms: must be greater than zero");
    } else if timers.restart_ms < 500 {
        result.warn(format!(
            "timers.restart_ms: {} ms is very short, peers may not answer in time",
            timers.restart_ms
        ));
    }

    if timers.max_configure == 0 {
        result.error("timers.max_configure: must be greater than zero");
    }
    if timers.max_terminate == 0 {
        result.error("timers.max_terminate: must be greater than zero");
    }
    if timers.pap_retries == 0 {
        result.error("timers.pap_retries: must be greater than zero");
    }

    if timers.echo_interval_secs == 0 {
        result.warn("timers.echo_interval_secs: 0 disables link keepalives");
    } else if timers.echo_failures == 0 {
        result.error("timers.echo_failures: must be greater than zero when echo is enabled");
    }
}

fn validate_transport(config: &Config, result: &mut ValidationResult) {
    for (field, value) in [
        ("transport.bind", &config.transport.bind),
        ("transport.peer", &config.transport.peer),
    ] {
        if value.parse::<SocketAddr>().is_err() {
            result.error(format!("{}: '{}' is not a socket address", field, value));
        }
    }

    if let Some(tunnel) = &config.tunnel {
        if tunnel.local_port == 0 {
            result.error("tunnel.local_port: must not be zero");
        }
        if tunnel.remote.port() == 0 {
            result.error("tunnel.remote: port must not be zero");
        }
    }
}

fn validate_logging(config: &Config, result: &mut ValidationResult) {
    if !is_known_level(&config.logging.level) {
        result.warn(format!(
            "logging.level: unknown level '{}', using info",
            config.logging.level
        ));
    }
}
