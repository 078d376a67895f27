//! Mock panel for testing without real hardware
//!
//! Records every call in a shared [`MockState`] so tests can keep a handle
//! after the panel itself has been moved into the render loop. Also used by
//! the daemon's `--dry-run` mode on development hosts.
//!
//! # Usage
//!
//! ```no_run
//! use oledd_hal::mock::MockPanel;
//! use oledd_hal::Panel;
//!
//! let mut panel = MockPanel::new(128, 64);
//! let state = panel.state();
//!
//! panel.power_off().unwrap();
//! assert_eq!(state.read().unwrap().power_off_calls, 1);
//! ```

use crate::panel::check_frame;
use crate::{Canvas, Panel, PanelError};
use std::sync::{Arc, RwLock};

/// Shared mock state for synchronized access
#[derive(Debug, Default)]
pub struct MockState {
    /// Last contrast applied (0-255)
    pub contrast: Option<u8>,
    /// Panel power state
    pub powered: bool,
    pub contrast_calls: u32,
    pub power_on_calls: u32,
    pub power_off_calls: u32,
    pub clear_calls: u32,
    pub frames_flushed: u32,
    /// Last committed frame
    pub last_frame: Option<Canvas>,
    /// Make every write fail (transient I/O fault injection)
    pub fail_writes: bool,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            powered: true,
            ..Default::default()
        }
    }
}

/// Mock panel for testing
pub struct MockPanel {
    width: u32,
    height: u32,
    state: Arc<RwLock<MockState>>,
}

impl MockPanel {
    /// Create a powered-on mock panel
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: Arc::new(RwLock::new(MockState::new())),
        }
    }

    /// Shared state handle
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        Arc::clone(&self.state)
    }

    /// Simulate a failing bus
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_writes = fail;
        }
    }

    fn write<F>(&self, op: &str, apply: F) -> Result<(), PanelError>
    where
        F: FnOnce(&mut MockState),
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| PanelError::Write("mock state poisoned".into()))?;
        if state.fail_writes {
            return Err(PanelError::Write(format!("[MOCK] {} failed", op)));
        }
        apply(&mut state);
        tracing::trace!("[MOCK] {}", op);
        Ok(())
    }
}

impl Panel for MockPanel {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), PanelError> {
        self.write("set_contrast", |s| {
            s.contrast = Some(level);
            s.contrast_calls += 1;
        })
    }

    fn power_on(&mut self) -> Result<(), PanelError> {
        self.write("power_on", |s| {
            s.powered = true;
            s.power_on_calls += 1;
        })
    }

    fn power_off(&mut self) -> Result<(), PanelError> {
        self.write("power_off", |s| {
            s.powered = false;
            s.power_off_calls += 1;
        })
    }

    fn clear(&mut self) -> Result<(), PanelError> {
        let blank = Canvas::new(self.width, self.height);
        self.write("clear", |s| {
            s.clear_calls += 1;
            s.last_frame = Some(blank);
        })
    }

    fn flush(&mut self, frame: &Canvas) -> Result<(), PanelError> {
        check_frame(frame, self.width, self.height)?;
        self.write("flush", |s| {
            s.frames_flushed += 1;
            s.last_frame = Some(frame.clone());
        })
    }
}
