//! Integration tests driving the display loop against mock hardware

use oledd_display::render::HEADER_HEIGHT;
use oledd_display::{ControlEvent, DisplayLoop, LoopState, Mode, QrBitmap, Scheduler, Screen, SharedScheduler};
use oledd_hal::mock::MockPanel;
use oledd_telemetry::mock::MockTelemetry;
use oledd_telemetry::{InterfaceAddr, NetworkSnapshot};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const QR_LINK: &str = "http://homeassistant.local:8123/";

/// Loop over a 128x64 mock panel with the default rotation
struct DisplayTestEnv {
    scheduler: SharedScheduler,
    telemetry: MockTelemetry,
    display: DisplayLoop<MockPanel, MockTelemetry>,
}

impl DisplayTestEnv {
    fn new(mode: Mode, now: Instant) -> Self {
        let scheduler = SharedScheduler::new(
            Scheduler::new(
                mode,
                vec![Screen::System, Screen::Network, Screen::Qr],
                Duration::from_secs(5),
                255,
                now,
            )
            .with_scroll_pause(0),
        );
        let telemetry = MockTelemetry::healthy();
        let display = DisplayLoop::new(
            MockPanel::new(128, 64),
            telemetry.clone(),
            scheduler.clone(),
            QrBitmap::new(QR_LINK, 128, 64),
        );

        Self {
            scheduler,
            telemetry,
            display,
        }
    }

    fn send(&self, event: ControlEvent) {
        self.scheduler.handle_event(event).unwrap();
    }
}

#[test]
fn test_auto_rotation_end_to_end() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::Auto, t0);

    let shown: Vec<_> = [0, 5, 10, 15]
        .iter()
        .map(|s| env.display.run_once(t0 + Duration::from_secs(*s)))
        .collect();

    assert_eq!(
        shown,
        vec![
            Some(Screen::System),
            Some(Screen::Network),
            Some(Screen::Qr),
            Some(Screen::System)
        ]
    );
    assert_eq!(env.display.frames_drawn(), 4);
}

#[test]
fn test_rotation_paused_outside_auto() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::Auto, t0);
    env.display.run_once(t0);

    env.send(ControlEvent::Mode("network".into()));
    for s in [5, 10, 15, 20] {
        assert_eq!(
            env.display.run_once(t0 + Duration::from_secs(s)),
            Some(Screen::Network)
        );
    }
    assert_eq!(env.scheduler.with(|s| s.rotation_index()), 0);
}

#[test]
fn test_mode_off_powers_down_once() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::System, t0);
    let panel = env.display.panel().state();
    env.display.run_once(t0);

    env.send(ControlEvent::Mode("off".into()));
    for i in 1..=5 {
        assert_eq!(env.display.run_once(t0 + Duration::from_millis(60 * i)), None);
    }
    {
        let s = panel.read().unwrap();
        assert_eq!(s.power_off_calls, 1);
        assert_eq!(s.frames_flushed, 1);
        assert!(!s.powered);
    }

    env.send(ControlEvent::Mode("system".into()));
    assert_eq!(env.display.run_once(t0 + Duration::from_secs(1)), Some(Screen::System));
    let s = panel.read().unwrap();
    assert_eq!(s.power_on_calls, 1);
    assert_eq!(s.frames_flushed, 2);
    assert!(s.powered);
}

#[test]
fn test_power_on_while_off_mode_stays_dark() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::System, t0);
    let panel = env.display.panel().state();
    env.display.run_once(t0);

    env.send(ControlEvent::Mode("off".into()));
    env.display.run_once(t0);
    env.send(ControlEvent::Power("on".into()));
    assert_eq!(env.display.run_once(t0), None);

    let s = panel.read().unwrap();
    assert_eq!(s.power_on_calls, 0);
    assert!(!s.powered);
}

#[test]
fn test_telemetry_failure_still_draws() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::System, t0);
    let panel = env.display.panel().state();
    env.telemetry.set_fail_all(true);

    assert_eq!(env.display.run_once(t0), Some(Screen::System));
    assert_eq!(env.display.frames_failed(), 0);
    assert!(env.telemetry.system_calls() >= 1);

    let s = panel.read().unwrap();
    assert_eq!(s.frames_flushed, 1);
    let frame = s.last_frame.as_ref().unwrap();
    assert!(frame.lit_pixels_in_rows(0, HEADER_HEIGHT) > 0);
    assert!(frame.lit_pixels_in_rows(HEADER_HEIGHT, 64) > 0);
    assert_eq!(env.scheduler.status().mode, Mode::System);
}

#[test]
fn test_brightness_reaches_panel_clamped() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::System, t0);
    let panel = env.display.panel().state();

    env.send(ControlEvent::Brightness("999".into()));
    env.display.run_once(t0);
    assert_eq!(panel.read().unwrap().contrast, Some(255));

    env.send(ControlEvent::Brightness("40".into()));
    env.display.run_once(t0);
    assert_eq!(panel.read().unwrap().contrast, Some(40));

    // Rejected value leaves the panel alone
    assert!(
        env.scheduler
            .handle_event(ControlEvent::Brightness("bright".into()))
            .is_err()
    );
    env.display.run_once(t0);
    let s = panel.read().unwrap();
    assert_eq!(s.contrast, Some(40));
    assert_eq!(s.contrast_calls, 2);
}

#[test]
fn test_long_interface_list_scrolls() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::Network, t0);
    env.telemetry.set_network_fallback(NetworkSnapshot {
        local_ip: None,
        interfaces: (0..8)
            .map(|i| InterfaceAddr {
                name: format!("eth{}", i),
                addr: Ipv4Addr::new(10, 0, 0, i + 1),
            })
            .collect(),
        reachable: false,
        ping_ms: None,
    });

    env.display.run_once(t0);
    let first = env.display.canvas().clone();
    for _ in 0..4 {
        env.display.run_once(t0);
    }

    assert!(env.scheduler.with(|s| s.scroll(oledd_display::ScrollSlot::Body).offset()) > 0);
    assert_ne!(env.display.canvas(), &first);
}

#[test]
fn test_text_event_shows_message() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::Auto, t0);
    env.display.run_once(t0);

    env.send(ControlEvent::Text("Hello".into()));
    assert_eq!(env.display.run_once(t0), Some(Screen::Manual));
    assert_eq!(env.scheduler.status().mode, Mode::Manual);
    assert!(env.display.canvas().lit_pixels_in_rows(HEADER_HEIGHT, 64) > 0);
}

#[test]
fn test_long_message_marquee_moves() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::Manual, t0);
    env.send(ControlEvent::Text(
        "A message far too long to fit on a single line of the panel".into(),
    ));

    env.display.run_once(t0);
    let start = env.display.canvas().clone();
    env.display.run_once(t0 + Duration::from_secs(1));

    assert_ne!(env.display.canvas(), &start);
}

#[test]
fn test_custom_data_screen() {
    let t0 = Instant::now();
    let mut env = DisplayTestEnv::new(Mode::Custom, t0);

    env.display.run_once(t0);
    let empty = env.display.canvas().clone();

    env.send(ControlEvent::CustomDatum {
        key: "greenhouse".into(),
        value: "21.5C".into(),
    });
    assert_eq!(env.display.run_once(t0), Some(Screen::Custom));
    assert_ne!(env.display.canvas(), &empty);
}

#[test]
fn test_loop_stops_on_flag() {
    let t0 = Instant::now();
    let env = DisplayTestEnv::new(Mode::System, t0);
    let panel = env.display.panel().state();
    let mut display = env.display.with_tick(Duration::from_millis(5));

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let handle = thread::spawn(move || {
        display.run(&flag);
        display
    });

    thread::sleep(Duration::from_millis(50));
    running.store(false, Ordering::SeqCst);
    let display = handle.join().unwrap();

    assert_eq!(display.state(), LoopState::Stopped);
    assert!(display.frames_drawn() > 0);
    let s = panel.read().unwrap();
    assert!(!s.powered);
    assert_eq!(s.power_off_calls, 1);
}
