//! Display engine for oledd
//!
//! Decides frame by frame what the panel shows and draws it.
//!
//! # Components
//!
//! - [`Scheduler`]: mode, rotation timer, operator message, custom data,
//!   brightness and power state, updated by [`ControlEvent`]s
//! - [`SharedScheduler`]: the scheduler behind one lock, with status
//!   change notifications for publishing
//! - [`ScrollState`] and [`marquee_offset`]: bounce and marquee scrolling
//! - [`render`]: screen renderers over `embedded-graphics`
//! - [`QrBitmap`]: QR symbol encoded once and scaled to the panel
//! - [`DisplayLoop`]: the tick loop driving a [`oledd_hal::Panel`]
//!
//! # Example
//!
//! ```no_run
//! use oledd_display::{ControlEvent, DisplayLoop, Mode, QrBitmap, Scheduler, Screen, SharedScheduler};
//! use oledd_hal::mock::MockPanel;
//! use oledd_telemetry::mock::MockTelemetry;
//! use std::time::{Duration, Instant};
//!
//! let now = Instant::now();
//! let rotation = vec![Screen::System, Screen::Network, Screen::Qr];
//! let scheduler = SharedScheduler::new(Scheduler::new(
//!     Mode::Auto,
//!     rotation,
//!     Duration::from_secs(5),
//!     255,
//!     now,
//! ));
//!
//! let mut display = DisplayLoop::new(
//!     MockPanel::new(128, 64),
//!     MockTelemetry::healthy(),
//!     scheduler.clone(),
//!     QrBitmap::new("http://homeassistant.local:8123/", 128, 64),
//! );
//!
//! scheduler.handle_event(ControlEvent::Text("Hello".into())).unwrap();
//! display.run_once(now);
//! ```

mod display_loop;
mod mode;
mod qr;
pub mod render;
mod scheduler;
mod scroll;
mod shared;

pub use display_loop::{DEFAULT_MARQUEE_SPEED, DEFAULT_TICK, DisplayLoop, LoopState};
pub use mode::{Mode, Screen, UnknownName};
pub use qr::{QrBitmap, QrError};
pub use scheduler::{
    ControlEvent, EventError, FrameContent, FramePlan, Scheduler, ScrollSlot, Status,
};
pub use scroll::{DEFAULT_PAUSE_TICKS, MARQUEE_GAP, ScrollState, marquee_offset};
pub use shared::SharedScheduler;
