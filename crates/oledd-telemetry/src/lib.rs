//! Host telemetry for oledd
//!
//! Supplies the system and network snapshots shown on the status screens.
//! Readings come from procfs, sysfs, `getifaddrs` and a `ping` probe.
//!
//! # Features
//!
//! - CPU usage from `/proc/stat` deltas between reads
//! - Memory, disk, CPU temperature and uptime
//! - Local address, IPv4 interfaces and reachability with latency
//! - Elapsed-time cache so a render loop can ask every frame

mod cache;
pub mod mock;
mod network;
mod system;

pub use cache::CachedTelemetry;
pub use network::{InterfaceAddr, NetworkProbe, parse_ping_time, select_interfaces};
pub use system::{CpuTimes, SystemProbe, parse_meminfo_percent, parse_proc_stat, parse_uptime};

use oledd_config::TelemetryConfig;
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Telemetry unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("System call failed: {0}")]
    Sys(#[from] nix::Error),
}

/// Host resource usage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub cpu_percent: Option<f32>,
    pub ram_percent: Option<f32>,
    pub disk_percent: Option<f32>,
    pub cpu_temp_celsius: Option<f32>,
    pub uptime: Option<Duration>,
}

impl SystemSnapshot {
    /// Whole hours of uptime
    pub fn uptime_hours(&self) -> Option<u64> {
        self.uptime.map(|u| u.as_secs() / 3600)
    }

    /// Minutes past the last whole hour of uptime
    pub fn uptime_minutes(&self) -> Option<u64> {
        self.uptime.map(|u| (u.as_secs() % 3600) / 60)
    }
}

/// Host network state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSnapshot {
    /// Source address used for outbound traffic
    pub local_ip: Option<IpAddr>,
    /// Non-loopback IPv4 interfaces in discovery order
    pub interfaces: Vec<InterfaceAddr>,
    pub reachable: bool,
    pub ping_ms: Option<f32>,
}

/// Supplier of telemetry snapshots
///
/// Reads may block briefly, so they belong on the render thread only.
pub trait TelemetrySource: Send {
    fn system_snapshot(&mut self) -> Result<SystemSnapshot, TelemetryError>;

    fn network_snapshot(&mut self) -> Result<NetworkSnapshot, TelemetryError>;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn system_snapshot(&mut self) -> Result<SystemSnapshot, TelemetryError> {
        (**self).system_snapshot()
    }

    fn network_snapshot(&mut self) -> Result<NetworkSnapshot, TelemetryError> {
        (**self).network_snapshot()
    }
}

/// Telemetry read from the running host
pub struct HostTelemetry {
    system: SystemProbe,
    network: NetworkProbe,
}

impl HostTelemetry {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            system: SystemProbe::new(config),
            network: NetworkProbe::new(config),
        }
    }

    /// Wrap in the elapsed-time cache configured for this host
    pub fn cached(config: &TelemetryConfig) -> CachedTelemetry<Self> {
        CachedTelemetry::new(
            Self::new(config),
            Duration::from_secs(config.system_cache_secs),
            Duration::from_secs(config.network_cache_secs),
        )
    }
}

impl TelemetrySource for HostTelemetry {
    fn system_snapshot(&mut self) -> Result<SystemSnapshot, TelemetryError> {
        self.system.snapshot()
    }

    fn network_snapshot(&mut self) -> Result<NetworkSnapshot, TelemetryError> {
        self.network.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_split() {
        let snapshot = SystemSnapshot {
            uptime: Some(Duration::from_secs(3 * 3600 + 7 * 60 + 59)),
            ..Default::default()
        };
        assert_eq!(snapshot.uptime_hours(), Some(3));
        assert_eq!(snapshot.uptime_minutes(), Some(7));

        let empty = SystemSnapshot::default();
        assert_eq!(empty.uptime_hours(), None);
    }

    #[test]
    fn test_telemetry_error_display() {
        let err = TelemetryError::Parse {
            what: "/proc/stat",
            detail: "empty".into(),
        };
        assert!(format!("{}", err).contains("/proc/stat"));

        let err = TelemetryError::Unavailable("no data".into());
        assert!(format!("{}", err).contains("no data"));
    }
}
