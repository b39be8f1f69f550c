//! Process configuration.
//!
//! Every setting can be given as a command-line flag or an environment
//! variable; flags win.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What happens to activity flags when a reviewer is reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReassignActivityPolicy {
    /// Only the assignment link moves; activity flags are untouched.
    #[default]
    LinksOnly,
    /// The outgoing reviewer becomes active and the replacement busy.
    Swap,
}

/// Settings of the dispenser engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispenserConfig {
    /// Deadline for every operation, storage included.
    pub request_timeout: Duration,
    pub reassign_activity: ReassignActivityPolicy,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
            reassign_activity: ReassignActivityPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pr-dispenser")]
#[command(about = "Assigns pull request reviewers within teams")]
pub struct Config {
    /// Port for the HTTP API
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind the HTTP API to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "pr-dispenser.db")]
    pub database: PathBuf,

    /// Per-request deadline in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 3)]
    pub request_timeout_secs: u64,

    /// Activity handling on reviewer reassignment
    #[arg(long, env = "REASSIGN_ACTIVITY", value_enum, default_value_t = ReassignActivityPolicy::LinksOnly)]
    pub reassign_activity: ReassignActivityPolicy,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Validate and derive the engine settings.
    pub fn dispenser_config(&self) -> Result<DispenserConfig, AppError> {
        if self.request_timeout_secs == 0 {
            return Err(AppError::bad_input_field(
                "request timeout must be at least one second",
                "request_timeout_secs",
            ));
        }
        Ok(DispenserConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            reassign_activity: self.reassign_activity,
        })
    }
}
