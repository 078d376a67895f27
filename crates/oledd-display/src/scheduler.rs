//! Mode scheduling
//!
//! [`Scheduler`] owns everything that decides what the next frame shows:
//! mode, rotation position and timer, the operator message, custom data,
//! brightness and power state, and the scroll positions. Control events
//! mutate it; [`Scheduler::tick`] turns it into a [`FramePlan`].

use crate::mode::{Mode, Screen, UnknownName};
use crate::scroll::ScrollState;
use oledd_config::ScheduleConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error(transparent)]
    UnknownMode(#[from] UnknownName),

    #[error("Invalid brightness: {0:?}")]
    InvalidBrightness(String),

    #[error("Invalid refresh interval: {0:?}")]
    InvalidRefreshInterval(String),

    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Custom data key is empty")]
    EmptyKey,
}

/// A control message from the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Mode name or alias
    Mode(String),
    /// Operator message, line breaks significant
    Text(String),
    /// Integer string, clamped to 0-255
    Brightness(String),
    /// `on`, `off`, `clear` and their `power_` forms
    Power(String),
    /// Rotation interval in whole seconds
    RefreshInterval(String),
    /// Custom data entry; an empty value removes the key
    CustomDatum { key: String, value: String },
}

impl ControlEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlEvent::Mode(_) => "mode",
            ControlEvent::Text(_) => "text",
            ControlEvent::Brightness(_) => "brightness",
            ControlEvent::Power(_) => "power",
            ControlEvent::RefreshInterval(_) => "refresh_interval",
            ControlEvent::CustomDatum { .. } => "custom_datum",
        }
    }
}

/// Published view of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub mode: Mode,
    pub brightness: u8,
    pub screen_on: bool,
    pub current_screen: Screen,
}

/// Which scroll state a renderer advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSlot {
    /// Tall screen bodies (network, custom data)
    Body,
    /// The operator message
    Manual,
}

/// Data a frame needs besides telemetry
#[derive(Debug, Clone, PartialEq)]
pub enum FrameContent {
    None,
    Text {
        text: Arc<str>,
        /// Time since the message was first drawn, drives the marquee
        shown_for: Duration,
    },
    Data(Vec<(String, String)>),
}

/// What the display loop should do on one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub screen: Screen,
    pub screen_on: bool,
    pub brightness: u8,
    /// Blank the panel once before anything else
    pub clear: bool,
    pub content: FrameContent,
    /// The rotation advanced on this tick
    pub rotated: bool,
}

impl FramePlan {
    /// Whether the panel should be lit for this frame
    pub fn panel_on(&self) -> bool {
        self.screen_on && self.screen != Screen::Off
    }
}

#[derive(Debug)]
pub struct Scheduler {
    mode: Mode,
    rotation: Vec<Screen>,
    rotation_index: usize,
    last_rotation: Instant,
    rotation_interval: Duration,
    /// Restart the rotation timer on the next tick
    rotation_restart: bool,

    manual_text: Arc<str>,
    /// First tick the current message was drawn on
    text_since: Option<Instant>,
    text_switches_mode: bool,

    custom_data: Vec<(String, String)>,

    brightness: u8,
    screen_on: bool,
    clear_requested: bool,

    body_scroll: ScrollState,
    manual_scroll: ScrollState,
}

impl Scheduler {
    /// Scheduler starting in `mode` with the rotation timer running from `now`
    pub fn new(
        mode: Mode,
        rotation: Vec<Screen>,
        rotation_interval: Duration,
        brightness: u8,
        now: Instant,
    ) -> Self {
        let rotation = if rotation.is_empty() {
            tracing::warn!("Empty rotation, falling back to the system screen");
            vec![Screen::System]
        } else {
            rotation
        };

        Self {
            mode,
            rotation,
            rotation_index: 0,
            last_rotation: now,
            rotation_interval,
            rotation_restart: false,
            manual_text: Arc::from(""),
            text_since: None,
            text_switches_mode: true,
            custom_data: Vec::new(),
            brightness,
            screen_on: mode != Mode::Off,
            clear_requested: false,
            body_scroll: ScrollState::default(),
            manual_scroll: ScrollState::default(),
        }
    }

    /// Build from the schedule section and the configured start brightness
    pub fn from_config(
        config: &ScheduleConfig,
        brightness: u8,
        now: Instant,
    ) -> Result<Self, UnknownName> {
        let mode: Mode = config.initial_mode.parse()?;
        let rotation = Screen::parse_rotation(&config.rotation)?;
        let mut scheduler = Self::new(
            mode,
            rotation,
            Duration::from_secs(config.rotation_interval_secs),
            brightness,
            now,
        )
        .with_scroll_pause(config.scroll_pause_ticks);
        scheduler.text_switches_mode = config.text_switches_mode;
        Ok(scheduler)
    }

    pub fn with_scroll_pause(mut self, ticks: u32) -> Self {
        self.body_scroll = ScrollState::new(ticks);
        self.manual_scroll = ScrollState::new(ticks);
        self
    }

    pub fn with_text_switches_mode(mut self, enabled: bool) -> Self {
        self.text_switches_mode = enabled;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rotation_index(&self) -> usize {
        self.rotation_index
    }

    pub fn rotation_interval(&self) -> Duration {
        self.rotation_interval
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn screen_on(&self) -> bool {
        self.screen_on
    }

    pub fn manual_text(&self) -> &str {
        &self.manual_text
    }

    pub fn custom_data(&self) -> &[(String, String)] {
        &self.custom_data
    }

    pub fn scroll(&self, slot: ScrollSlot) -> &ScrollState {
        match slot {
            ScrollSlot::Body => &self.body_scroll,
            ScrollSlot::Manual => &self.manual_scroll,
        }
    }

    /// Screen for the current mode and rotation position
    pub fn current_screen(&self) -> Screen {
        match self.mode.fixed_screen() {
            Some(screen) => screen,
            None => self.rotation[self.rotation_index % self.rotation.len()],
        }
    }

    pub fn status(&self) -> Status {
        Status {
            mode: self.mode,
            brightness: self.brightness,
            screen_on: self.screen_on,
            current_screen: self.current_screen(),
        }
    }

    /// Apply a control event
    ///
    /// Returns whether the published status changed. Malformed payloads are
    /// rejected without touching any state.
    pub fn handle_event(&mut self, event: ControlEvent) -> Result<bool, EventError> {
        let before = self.status();

        match event {
            ControlEvent::Mode(name) => {
                let mode: Mode = name.parse()?;
                self.set_mode(mode);
            }
            ControlEvent::Text(text) => {
                self.manual_text = Arc::from(text.as_str());
                self.text_since = None;
                self.manual_scroll.reset();
                if self.text_switches_mode {
                    self.set_mode(Mode::Manual);
                }
            }
            ControlEvent::Brightness(payload) => {
                let level: i64 = payload
                    .trim()
                    .parse()
                    .map_err(|_| EventError::InvalidBrightness(payload.clone()))?;
                self.brightness = level.clamp(0, 255) as u8;
            }
            ControlEvent::Power(payload) => match payload.trim().to_ascii_lowercase().as_str() {
                "on" | "power_on" => self.screen_on = true,
                "off" | "power_off" => self.screen_on = false,
                "clear" => self.clear_requested = true,
                _ => return Err(EventError::UnknownCommand(payload)),
            },
            ControlEvent::RefreshInterval(payload) => {
                let secs: u64 = payload
                    .trim()
                    .parse()
                    .ok()
                    .filter(|&s| s > 0)
                    .ok_or_else(|| EventError::InvalidRefreshInterval(payload.clone()))?;
                self.rotation_interval = Duration::from_secs(secs);
            }
            ControlEvent::CustomDatum { key, value } => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(EventError::EmptyKey);
                }
                self.set_datum(key, value);
            }
        }

        Ok(self.status() != before)
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        if mode == Mode::Off {
            self.screen_on = false;
        } else if self.mode == Mode::Off {
            self.screen_on = true;
        }
        if mode == Mode::Auto {
            self.rotation_index = 0;
            self.rotation_restart = true;
        }
        self.mode = mode;
        self.body_scroll.reset();
        self.manual_scroll.reset();
        self.text_since = None;
        tracing::info!("Mode changed to {}", mode);
    }

    fn set_datum(&mut self, key: &str, value: String) {
        let existing = self.custom_data.iter().position(|(k, _)| k == key);
        match (existing, value.is_empty()) {
            (Some(index), true) => {
                self.custom_data.remove(index);
            }
            (Some(index), false) => self.custom_data[index].1 = value,
            (None, true) => {}
            (None, false) => self.custom_data.push((key.to_string(), value)),
        }
    }

    /// Decide the frame for `now`
    ///
    /// In auto mode the rotation advances once each time a full interval has
    /// elapsed since the last advance. The timer is anchored to the previous
    /// deadline, so irregular tick spacing never skips or repeats a screen.
    pub fn tick(&mut self, now: Instant) -> FramePlan {
        let mut rotated = false;

        if self.mode == Mode::Auto {
            if self.rotation_restart {
                self.last_rotation = now;
                self.rotation_restart = false;
            }
            if now.saturating_duration_since(self.last_rotation) >= self.rotation_interval {
                self.rotation_index = (self.rotation_index + 1) % self.rotation.len();
                self.last_rotation += self.rotation_interval;
                // After a long stall restart the timer instead of catching up
                if now.saturating_duration_since(self.last_rotation) >= self.rotation_interval {
                    self.last_rotation = now;
                }
                self.body_scroll.reset();
                rotated = true;
                tracing::debug!("Rotated to {}", self.current_screen());
            }
        }

        let screen = self.current_screen();
        let content = match screen {
            Screen::Manual => {
                let since = *self.text_since.get_or_insert(now);
                FrameContent::Text {
                    text: Arc::clone(&self.manual_text),
                    shown_for: now.saturating_duration_since(since),
                }
            }
            Screen::Custom => FrameContent::Data(self.custom_data.clone()),
            _ => FrameContent::None,
        };

        FramePlan {
            screen,
            screen_on: self.screen_on,
            brightness: self.brightness,
            clear: std::mem::take(&mut self.clear_requested),
            content,
            rotated,
        }
    }

    /// Step one scroll state and return the offset to draw with
    pub fn advance_scroll(
        &mut self,
        slot: ScrollSlot,
        content_height: u32,
        visible_height: u32,
    ) -> u32 {
        match slot {
            ScrollSlot::Body => self.body_scroll.advance(content_height, visible_height),
            ScrollSlot::Manual => self.manual_scroll.advance(content_height, visible_height),
        }
    }
}
