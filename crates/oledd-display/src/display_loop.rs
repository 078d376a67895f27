//! Render loop
//!
//! Each tick asks the scheduler for a [`FramePlan`], reconciles contrast and
//! power with the panel, reads telemetry when the screen needs it, paints the
//! frame on a [`Canvas`] and commits it. Panel and telemetry failures are
//! logged and the loop moves on to the next tick.

use crate::mode::Screen;
use crate::qr::{QrBitmap, QrError};
use crate::render::{self, Layout};
use crate::scheduler::{FrameContent, FramePlan, ScrollSlot};
use crate::scroll::{MARQUEE_GAP, marquee_offset};
use crate::shared::SharedScheduler;
use oledd_hal::{Canvas, Panel, PanelError};
use oledd_telemetry::{SystemSnapshot, TelemetrySource};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default render period
pub const DEFAULT_TICK: Duration = Duration::from_millis(60);

/// Default marquee speed in pixels per second
pub const DEFAULT_MARQUEE_SPEED: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping,
    Stopped,
}

/// Body prepared outside the canvas borrow
enum Body {
    System(Option<SystemSnapshot>),
    Lines {
        title: &'static str,
        lines: Vec<String>,
        offset: u32,
    },
    Marquee {
        text: String,
        offset: u32,
    },
    Qr,
    Blank,
}

pub struct DisplayLoop<P: Panel, T: TelemetrySource> {
    panel: P,
    telemetry: T,
    scheduler: SharedScheduler,
    layout: Layout,
    canvas: Canvas,
    qr: Result<QrBitmap, String>,
    tick: Duration,
    marquee_px_per_sec: u32,
    /// Power state last applied to the panel
    panel_on: bool,
    /// Contrast last applied to the panel
    contrast: Option<u8>,
    state: LoopState,
    frames_drawn: u64,
    frames_failed: u64,
}

impl<P: Panel, T: TelemetrySource> DisplayLoop<P, T> {
    /// Build a loop for an initialized, powered-on panel
    pub fn new(
        panel: P,
        telemetry: T,
        scheduler: SharedScheduler,
        qr: Result<QrBitmap, QrError>,
    ) -> Self {
        let (width, height) = panel.size();
        let qr = qr.map_err(|e| {
            tracing::warn!("QR screen disabled: {}", e);
            e.to_string()
        });

        Self {
            panel,
            telemetry,
            scheduler,
            layout: Layout::new(width, height),
            canvas: Canvas::new(width, height),
            qr,
            tick: DEFAULT_TICK,
            marquee_px_per_sec: DEFAULT_MARQUEE_SPEED,
            panel_on: true,
            contrast: None,
            state: LoopState::Stopped,
            frames_drawn: 0,
            frames_failed: 0,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_marquee_speed(mut self, px_per_sec: u32) -> Self {
        self.marquee_px_per_sec = px_per_sec;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    /// Last frame painted, committed or not
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn frames_failed(&self) -> u64 {
        self.frames_failed
    }

    /// Run ticks until `running` is cleared, then blank and power down
    pub fn run(&mut self, running: &AtomicBool) {
        self.state = LoopState::Running;
        tracing::info!("Display loop running, tick {}ms", self.tick.as_millis());

        while running.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.run_once(started);
            if let Some(rest) = self.tick.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        self.shutdown();
    }

    /// Blank and power down the panel
    pub fn shutdown(&mut self) {
        self.state = LoopState::Stopping;
        tracing::info!("Display loop stopping");

        if let Err(e) = self.panel.clear() {
            tracing::warn!("Failed to clear panel: {}", e);
        }
        if let Err(e) = self.panel.power_off() {
            tracing::warn!("Failed to power off panel: {}", e);
        }
        self.panel_on = false;

        self.state = LoopState::Stopped;
        tracing::info!(
            "Display loop stopped after {} frames ({} failed)",
            self.frames_drawn,
            self.frames_failed
        );
    }

    /// One tick; returns the screen committed, if any
    pub fn run_once(&mut self, now: Instant) -> Option<Screen> {
        match self.frame(now) {
            Ok(drawn) => drawn,
            Err(e) => {
                self.frames_failed += 1;
                tracing::warn!("Frame failed: {}", e);
                None
            }
        }
    }

    fn frame(&mut self, now: Instant) -> Result<Option<Screen>, PanelError> {
        let plan = self.scheduler.tick(now);

        if plan.clear {
            self.canvas.clear();
            self.panel.clear()?;
            tracing::info!("Panel cleared");
        }

        if self.contrast != Some(plan.brightness) {
            self.panel.set_contrast(plan.brightness)?;
            self.contrast = Some(plan.brightness);
            tracing::debug!("Contrast set to {}", plan.brightness);
        }

        let on = plan.panel_on();
        if on != self.panel_on {
            if on {
                self.panel.power_on()?;
            } else {
                self.panel.power_off()?;
            }
            self.panel_on = on;
            tracing::info!("Panel powered {}", if on { "on" } else { "off" });
        }
        if !on {
            return Ok(None);
        }

        let body = self.prepare(&plan);
        self.canvas.clear();
        let Ok(()) = self.paint(body);
        tracing::trace!("Painted {}", plan.screen);
        self.panel.flush(&self.canvas)?;
        self.frames_drawn += 1;
        Ok(Some(plan.screen))
    }

    /// Gather telemetry and scroll offsets; no lock is held while reading
    fn prepare(&mut self, plan: &FramePlan) -> Body {
        let visible = self.layout.visible_body_height();

        match (plan.screen, &plan.content) {
            (Screen::System, _) => Body::System(match self.telemetry.system_snapshot() {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::debug!("System screen without telemetry: {}", e);
                    None
                }
            }),
            (Screen::Network, _) => {
                let snapshot = match self.telemetry.network_snapshot() {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        tracing::debug!("Network screen without telemetry: {}", e);
                        None
                    }
                };
                let lines = render::network_lines(snapshot.as_ref());
                self.scrolled_lines("NETWORK", lines, ScrollSlot::Body, visible)
            }
            (Screen::Custom, FrameContent::Data(data)) => {
                let lines = render::custom_lines(data);
                self.scrolled_lines("DATA", lines, ScrollSlot::Body, visible)
            }
            (Screen::Custom, _) => self.scrolled_lines(
                "DATA",
                render::custom_lines(&[]),
                ScrollSlot::Body,
                visible,
            ),
            (Screen::Manual, FrameContent::Text { text, shown_for }) => {
                if render::needs_marquee(text, &self.layout) {
                    let offset = marquee_offset(
                        *shown_for,
                        self.marquee_px_per_sec,
                        render::text_width(text),
                        MARQUEE_GAP,
                    );
                    Body::Marquee {
                        text: text.to_string(),
                        offset,
                    }
                } else {
                    let lines = render::manual_lines(text)
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                    self.scrolled_lines("MESSAGE", lines, ScrollSlot::Manual, visible)
                }
            }
            (Screen::Manual, _) => Body::Lines {
                title: "MESSAGE",
                lines: Vec::new(),
                offset: 0,
            },
            (Screen::Qr, _) => Body::Qr,
            (Screen::Off, _) => Body::Blank,
        }
    }

    fn scrolled_lines(
        &self,
        title: &'static str,
        lines: Vec<String>,
        slot: ScrollSlot,
        visible: u32,
    ) -> Body {
        let offset =
            self.scheduler
                .advance_scroll(slot, render::content_height(lines.len()), visible);
        Body::Lines {
            title,
            lines,
            offset,
        }
    }

    fn paint(&mut self, body: Body) -> Result<(), Infallible> {
        let layout = self.layout;
        let canvas = &mut self.canvas;

        match body {
            Body::System(snapshot) => {
                let clock = chrono::Local::now().format("%H:%M:%S").to_string();
                render::render_system(canvas, &layout, snapshot.as_ref(), &clock)
            }
            Body::Lines {
                title,
                lines,
                offset,
            } => render::render_lines(canvas, &layout, title, &lines, offset),
            Body::Marquee { text, offset } => render::render_marquee(canvas, &layout, &text, offset),
            Body::Qr => match &self.qr {
                Ok(qr) => qr.draw(canvas),
                Err(_) => render::render_placeholder(canvas, &layout, "QR", "QR unavailable"),
            },
            Body::Blank => Ok(()),
        }
    }
}
