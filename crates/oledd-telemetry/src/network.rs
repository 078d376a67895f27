//! Local addresses and internet reachability

use crate::{NetworkSnapshot, TelemetryError};
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use oledd_config::TelemetryConfig;
use serde::Serialize;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// An IPv4 address bound to a named interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceAddr {
    pub name: String,
    pub addr: Ipv4Addr,
}

/// Keep the first address per interface, at most `max` interfaces
pub fn select_interfaces<I>(addrs: I, max: usize) -> Vec<InterfaceAddr>
where
    I: IntoIterator<Item = InterfaceAddr>,
{
    let mut seen = HashSet::new();
    addrs
        .into_iter()
        .filter(|a| seen.insert(a.name.clone()))
        .take(max)
        .collect()
}

/// Round-trip time from `ping` output (`time=12.3 ms`)
pub fn parse_ping_time(output: &str) -> Option<f32> {
    let start = output.find("time=")? + "time=".len();
    let rest = &output[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Reads interface addresses and probes a remote host
pub struct NetworkProbe {
    ping_host: String,
    ping_timeout: Duration,
    max_interfaces: usize,
}

impl NetworkProbe {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            ping_host: config.ping_host.clone(),
            ping_timeout: Duration::from_millis(config.ping_timeout_ms),
            max_interfaces: config.max_interfaces,
        }
    }

    pub fn snapshot(&mut self) -> Result<NetworkSnapshot, TelemetryError> {
        let local_ip = match self.local_ip() {
            Ok(ip) => Some(ip),
            Err(e) => {
                tracing::debug!("No outbound address: {}", e);
                None
            }
        };

        let interfaces = self.interfaces()?;

        let ping_ms = match self.ping() {
            Ok(ms) => ms,
            Err(e) => {
                tracing::debug!("Ping {} failed: {}", self.ping_host, e);
                None
            }
        };

        Ok(NetworkSnapshot {
            local_ip,
            interfaces,
            reachable: ping_ms.is_some(),
            ping_ms,
        })
    }

    /// Source address the kernel picks for outbound traffic
    ///
    /// Connecting a UDP socket sends nothing, it only resolves the route.
    fn local_ip(&self) -> Result<IpAddr, TelemetryError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect((self.ping_host.as_str(), 80))?;
        Ok(socket.local_addr()?.ip())
    }

    fn interfaces(&self) -> Result<Vec<InterfaceAddr>, TelemetryError> {
        let addrs = getifaddrs()?.filter_map(|ifaddr| {
            if ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK) {
                return None;
            }
            let sin = ifaddr.address.as_ref()?.as_sockaddr_in()?;
            Some(InterfaceAddr {
                name: ifaddr.interface_name.clone(),
                addr: *SocketAddrV4::from(*sin).ip(),
            })
        });
        Ok(select_interfaces(addrs, self.max_interfaces))
    }

    /// One echo request; `Ok(None)` when the host did not answer in time
    fn ping(&self) -> Result<Option<f32>, TelemetryError> {
        let wait_secs = self.ping_timeout.as_secs().max(1).to_string();
        let mut child = Command::new("ping")
            .args(["-c", "1", "-W", &wait_secs, &self.ping_host])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let deadline = Instant::now() + self.ping_timeout;
        loop {
            if child.try_wait()?.is_some() {
                break;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(20));
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ping_time(&stdout)
            .map(Some)
            .ok_or_else(|| TelemetryError::Probe(format!("no round-trip time in: {}", stdout.trim())))
    }
}
