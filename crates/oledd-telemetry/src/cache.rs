//! Elapsed-time snapshot cache

use crate::{NetworkSnapshot, SystemSnapshot, TelemetryError, TelemetrySource};
use std::time::{Duration, Instant};

struct Slot<T> {
    ttl: Duration,
    fetched_at: Option<Instant>,
    value: Option<T>,
    last_error: Option<String>,
}

impl<T: Clone> Slot<T> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            fetched_at: None,
            value: None,
            last_error: None,
        }
    }

    fn get<F>(&mut self, now: Instant, what: &str, fetch: F) -> Result<T, TelemetryError>
    where
        F: FnOnce() -> Result<T, TelemetryError>,
    {
        let fresh = self
            .fetched_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.ttl);
        if fresh {
            match (&self.value, &self.last_error) {
                (Some(value), _) => return Ok(value.clone()),
                (None, Some(error)) => return Err(TelemetryError::Unavailable(error.clone())),
                (None, None) => {}
            }
        }

        match fetch() {
            Ok(value) => {
                self.fetched_at = Some(now);
                self.value = Some(value.clone());
                self.last_error = None;
                Ok(value)
            }
            Err(e) => {
                // Hold off the next attempt for one period, stale data wins
                self.fetched_at = Some(now);
                self.last_error = Some(e.to_string());
                match &self.value {
                    Some(stale) => {
                        tracing::warn!("{} refresh failed, keeping last reading: {}", what, e);
                        Ok(stale.clone())
                    }
                    None => {
                        tracing::warn!("{} unavailable: {}", what, e);
                        Err(e)
                    }
                }
            }
        }
    }
}

/// Reuses snapshots from an inner source until they age out
///
/// A failed refresh keeps serving the previous snapshot. Without one the
/// error is returned, and not retried again until the period elapses.
pub struct CachedTelemetry<S> {
    source: S,
    system: Slot<SystemSnapshot>,
    network: Slot<NetworkSnapshot>,
}

impl<S: TelemetrySource> CachedTelemetry<S> {
    pub fn new(source: S, system_ttl: Duration, network_ttl: Duration) -> Self {
        Self {
            source,
            system: Slot::new(system_ttl),
            network: Slot::new(network_ttl),
        }
    }

    pub fn system_snapshot_at(&mut self, now: Instant) -> Result<SystemSnapshot, TelemetryError> {
        let source = &mut self.source;
        self.system
            .get(now, "System telemetry", || source.system_snapshot())
    }

    pub fn network_snapshot_at(&mut self, now: Instant) -> Result<NetworkSnapshot, TelemetryError> {
        let source = &mut self.source;
        self.network
            .get(now, "Network telemetry", || source.network_snapshot())
    }
}

impl<S: TelemetrySource> TelemetrySource for CachedTelemetry<S> {
    fn system_snapshot(&mut self) -> Result<SystemSnapshot, TelemetryError> {
        self.system_snapshot_at(Instant::now())
    }

    fn network_snapshot(&mut self) -> Result<NetworkSnapshot, TelemetryError> {
        self.network_snapshot_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTelemetry;

    fn snapshot(cpu: f32) -> SystemSnapshot {
        SystemSnapshot {
            cpu_percent: Some(cpu),
            ..Default::default()
        }
    }

    fn cached(mock: MockTelemetry) -> CachedTelemetry<MockTelemetry> {
        CachedTelemetry::new(mock, Duration::from_secs(2), Duration::from_secs(3))
    }

    #[test]
    fn test_serves_from_cache_within_ttl() {
        let mock = MockTelemetry::new();
        mock.push_system(Ok(snapshot(10.0)));
        mock.push_system(Ok(snapshot(20.0)));
        let mut cache = cached(mock.clone());

        let t0 = Instant::now();
        assert_eq!(cache.system_snapshot_at(t0).unwrap().cpu_percent, Some(10.0));
        let again = cache.system_snapshot_at(t0 + Duration::from_millis(1999));
        assert_eq!(again.unwrap().cpu_percent, Some(10.0));
        assert_eq!(mock.system_calls(), 1);

        let later = cache.system_snapshot_at(t0 + Duration::from_secs(2));
        assert_eq!(later.unwrap().cpu_percent, Some(20.0));
        assert_eq!(mock.system_calls(), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_stale_value() {
        let mock = MockTelemetry::new();
        mock.push_system(Ok(snapshot(10.0)));
        mock.push_system(Err(TelemetryError::Unavailable("gone".into())));
        let mut cache = cached(mock.clone());

        let t0 = Instant::now();
        cache.system_snapshot_at(t0).unwrap();
        let stale = cache.system_snapshot_at(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(stale.cpu_percent, Some(10.0));

        // Failure counts as a fetch, no retry until the period elapses
        cache
            .system_snapshot_at(t0 + Duration::from_secs(4))
            .unwrap();
        assert_eq!(mock.system_calls(), 2);
    }

    #[test]
    fn test_error_without_previous_value() {
        let mock = MockTelemetry::new();
        mock.push_network(Err(TelemetryError::Probe("no route".into())));
        let mut cache = cached(mock.clone());

        let t0 = Instant::now();
        assert!(cache.network_snapshot_at(t0).is_err());

        // Retried after the network period
        assert!(cache.network_snapshot_at(t0 + Duration::from_secs(1)).is_err());
        assert_eq!(mock.network_calls(), 1);
        cache.network_snapshot_at(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(mock.network_calls(), 2);
    }

    #[test]
    fn test_kinds_cached_independently() {
        let mock = MockTelemetry::new();
        let mut cache = cached(mock.clone());
        let t0 = Instant::now();

        cache.system_snapshot_at(t0).unwrap();
        cache.network_snapshot_at(t0).unwrap();
        cache.system_snapshot_at(t0 + Duration::from_secs(2)).unwrap();
        cache.network_snapshot_at(t0 + Duration::from_secs(2)).unwrap();

        assert_eq!(mock.system_calls(), 2);
        assert_eq!(mock.network_calls(), 1);
    }
}
