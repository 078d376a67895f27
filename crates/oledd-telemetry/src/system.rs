//! CPU, memory, disk, temperature and uptime
//!
//! Each field is read independently. A field that cannot be read is left
//! empty instead of failing the whole snapshot.

use crate::{SystemSnapshot, TelemetryError};
use oledd_config::TelemetryConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Aggregate CPU counters from the first line of `/proc/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    /// idle + iowait
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Busy percentage between two samples, or since boot without a previous one
    pub fn busy_percent_since(&self, previous: Option<CpuTimes>) -> Option<f32> {
        let (idle, total) = match previous {
            Some(prev) => (
                self.idle.checked_sub(prev.idle)?,
                self.total.checked_sub(prev.total)?,
            ),
            None => (self.idle, self.total),
        };
        if total == 0 {
            return None;
        }
        let busy = total.saturating_sub(idle) as f32 / total as f32;
        Some((busy * 100.0).clamp(0.0, 100.0))
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`
pub fn parse_proc_stat(contents: &str) -> Result<CpuTimes, TelemetryError> {
    let parse_err = |detail: &str| TelemetryError::Parse {
        what: "/proc/stat",
        detail: detail.to_string(),
    };

    let line = contents
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| parse_err("no aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| parse_err(&e.to_string()))?;

    if fields.len() < 4 {
        return Err(parse_err("too few fields"));
    }

    // user nice system idle iowait irq softirq steal (guest is already in user)
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total = fields.iter().take(8).sum();
    Ok(CpuTimes { idle, total })
}

/// Memory in use as a percentage, from `/proc/meminfo`
pub fn parse_meminfo_percent(contents: &str) -> Result<f32, TelemetryError> {
    let mut total = None;
    let mut available = None;
    let mut free_fallback = 0u64;

    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total = Some(kb),
            "MemAvailable:" => available = Some(kb),
            "MemFree:" | "Buffers:" | "Cached:" => free_fallback += kb,
            _ => {}
        }
    }

    let total = total
        .filter(|&t| t > 0)
        .ok_or_else(|| TelemetryError::Parse {
            what: "/proc/meminfo",
            detail: "missing MemTotal".into(),
        })?;
    let available = available.unwrap_or(free_fallback).min(total);
    Ok((total - available) as f32 / total as f32 * 100.0)
}

/// Uptime from the first field of `/proc/uptime`
pub fn parse_uptime(contents: &str) -> Result<Duration, TelemetryError> {
    contents
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| TelemetryError::Parse {
            what: "/proc/uptime",
            detail: contents.trim().to_string(),
        })
}

/// Reads host resource usage
pub struct SystemProbe {
    proc_root: PathBuf,
    disk_path: PathBuf,
    thermal_zone: PathBuf,
    last_cpu: Option<CpuTimes>,
}

impl SystemProbe {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self::with_paths(
            Path::new("/proc"),
            Path::new(&config.disk_path),
            Path::new(&config.thermal_zone),
        )
    }

    /// Probe rooted at alternative paths
    pub fn with_paths(proc_root: &Path, disk_path: &Path, thermal_zone: &Path) -> Self {
        Self {
            proc_root: proc_root.to_path_buf(),
            disk_path: disk_path.to_path_buf(),
            thermal_zone: thermal_zone.to_path_buf(),
            last_cpu: None,
        }
    }

    /// Take a snapshot; fails only when no field could be read
    pub fn snapshot(&mut self) -> Result<SystemSnapshot, TelemetryError> {
        let snapshot = SystemSnapshot {
            cpu_percent: self.log_failure("cpu", |p| p.read_cpu_percent()),
            ram_percent: self.log_failure("memory", |p| p.read_ram_percent()),
            disk_percent: self.log_failure("disk", |p| p.read_disk_percent()),
            cpu_temp_celsius: self.log_failure("temperature", |p| p.read_cpu_temp()),
            uptime: self.log_failure("uptime", |p| p.read_uptime()),
        };

        if snapshot == SystemSnapshot::default() {
            return Err(TelemetryError::Unavailable(
                "no system metric could be read".into(),
            ));
        }
        Ok(snapshot)
    }

    fn log_failure<T, F>(&mut self, what: &str, read: F) -> Option<T>
    where
        F: FnOnce(&mut Self) -> Result<T, TelemetryError>,
    {
        match read(self) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", what, e);
                None
            }
        }
    }

    fn read_cpu_percent(&mut self) -> Result<f32, TelemetryError> {
        let contents = fs::read_to_string(self.proc_root.join("stat"))?;
        let times = parse_proc_stat(&contents)?;
        let percent = times.busy_percent_since(self.last_cpu);
        self.last_cpu = Some(times);
        percent.ok_or_else(|| TelemetryError::Unavailable("cpu counters did not advance".into()))
    }

    fn read_ram_percent(&mut self) -> Result<f32, TelemetryError> {
        let contents = fs::read_to_string(self.proc_root.join("meminfo"))?;
        parse_meminfo_percent(&contents)
    }

    fn read_disk_percent(&mut self) -> Result<f32, TelemetryError> {
        let stat = nix::sys::statvfs::statvfs(self.disk_path.as_path())?;
        let blocks = stat.blocks() as u64;
        let free = stat.blocks_free() as u64;
        if blocks == 0 {
            return Err(TelemetryError::Unavailable(format!(
                "{} reports no blocks",
                self.disk_path.display()
            )));
        }
        Ok(blocks.saturating_sub(free) as f32 / blocks as f32 * 100.0)
    }

    fn read_cpu_temp(&mut self) -> Result<f32, TelemetryError> {
        let contents = fs::read_to_string(&self.thermal_zone)?;
        let millidegrees: f32 = contents.trim().parse().map_err(|_| TelemetryError::Parse {
            what: "thermal zone",
            detail: contents.trim().to_string(),
        })?;
        Ok(millidegrees / 1000.0)
    }

    fn read_uptime(&mut self) -> Result<Duration, TelemetryError> {
        let contents = fs::read_to_string(self.proc_root.join("uptime"))?;
        parse_uptime(&contents)
    }
}
