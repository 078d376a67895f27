//! Scripted telemetry for tests and dry runs

use crate::{InterfaceAddr, NetworkSnapshot, SystemSnapshot, TelemetryError, TelemetrySource};
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LAN_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

#[derive(Default)]
struct MockState {
    system: VecDeque<Result<SystemSnapshot, TelemetryError>>,
    network: VecDeque<Result<NetworkSnapshot, TelemetryError>>,
    system_fallback: SystemSnapshot,
    network_fallback: NetworkSnapshot,
    fail_all: bool,
    system_calls: usize,
    network_calls: usize,
}

/// Telemetry source that replays queued results
///
/// Once a queue runs dry the fallback snapshot is returned. Clones share
/// state, so a test can keep a handle after moving one into a loop.
#[derive(Clone, Default)]
pub struct MockTelemetry {
    state: Arc<Mutex<MockState>>,
}

impl MockTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback snapshots resembling a healthy host
    pub fn healthy() -> Self {
        let mock = Self::new();
        mock.set_system_fallback(SystemSnapshot {
            cpu_percent: Some(12.5),
            ram_percent: Some(41.0),
            disk_percent: Some(63.0),
            cpu_temp_celsius: Some(47.2),
            uptime: Some(Duration::from_secs(5 * 3600 + 12 * 60)),
        });
        mock.set_network_fallback(NetworkSnapshot {
            local_ip: Some(IpAddr::V4(LAN_ADDR)),
            interfaces: vec![InterfaceAddr {
                name: "eth0".into(),
                addr: LAN_ADDR,
            }],
            reachable: true,
            ping_ms: Some(14.0),
        });
        mock
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }

    pub fn push_system(&self, result: Result<SystemSnapshot, TelemetryError>) {
        self.with_state(|s| s.system.push_back(result));
    }

    pub fn push_network(&self, result: Result<NetworkSnapshot, TelemetryError>) {
        self.with_state(|s| s.network.push_back(result));
    }

    pub fn set_system_fallback(&self, snapshot: SystemSnapshot) {
        self.with_state(|s| s.system_fallback = snapshot);
    }

    pub fn set_network_fallback(&self, snapshot: NetworkSnapshot) {
        self.with_state(|s| s.network_fallback = snapshot);
    }

    /// Make every read fail until cleared
    pub fn set_fail_all(&self, fail: bool) {
        self.with_state(|s| s.fail_all = fail);
    }

    pub fn system_calls(&self) -> usize {
        self.with_state(|s| s.system_calls)
    }

    pub fn network_calls(&self) -> usize {
        self.with_state(|s| s.network_calls)
    }
}

impl TelemetrySource for MockTelemetry {
    fn system_snapshot(&mut self) -> Result<SystemSnapshot, TelemetryError> {
        self.with_state(|s| {
            s.system_calls += 1;
            if s.fail_all {
                return Err(TelemetryError::Unavailable("mock failure".into()));
            }
            s.system
                .pop_front()
                .unwrap_or_else(|| Ok(s.system_fallback.clone()))
        })
    }

    fn network_snapshot(&mut self) -> Result<NetworkSnapshot, TelemetryError> {
        self.with_state(|s| {
            s.network_calls += 1;
            if s.fail_all {
                return Err(TelemetryError::Unavailable("mock failure".into()));
            }
            s.network
                .pop_front()
                .unwrap_or_else(|| Ok(s.network_fallback.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_then_fallback() {
        let mut mock = MockTelemetry::new();
        mock.push_system(Err(TelemetryError::Probe("first".into())));

        assert!(mock.system_snapshot().is_err());
        assert_eq!(mock.system_snapshot().unwrap(), SystemSnapshot::default());
        assert_eq!(mock.system_calls(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockTelemetry::healthy();
        let mut moved = mock.clone();

        let network = moved.network_snapshot().unwrap();
        assert!(network.reachable);
        assert_eq!(network.interfaces[0].name, "eth0");
        assert_eq!(mock.network_calls(), 1);

        mock.set_fail_all(true);
        assert!(moved.system_snapshot().is_err());
    }
}
