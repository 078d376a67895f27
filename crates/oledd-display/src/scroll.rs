//! Scroll animation
//!
//! Vertical scrolling bounces between the top and bottom of the content and
//! advances one pixel per frame. Horizontal marquee is derived from elapsed
//! time so its speed does not depend on the frame rate.

use std::time::Duration;

/// Ticks held at each end of a bounce
pub const DEFAULT_PAUSE_TICKS: u32 = 25;

/// Blank pixels between the end of a marquee line and its repeat
pub const MARQUEE_GAP: u32 = 24;

/// Bounce scroll position for one piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    offset: u32,
    /// +1 towards the bottom, -1 towards the top
    direction: i8,
    pause_remaining: u32,
    pause_ticks: u32,
}

impl ScrollState {
    /// Start at the top, moving down, after an initial pause
    pub fn new(pause_ticks: u32) -> Self {
        Self {
            offset: 0,
            direction: 1,
            pause_remaining: pause_ticks,
            pause_ticks,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.pause_ticks);
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn direction(&self) -> i8 {
        self.direction
    }

    pub fn is_paused(&self) -> bool {
        self.pause_remaining > 0
    }

    /// Step one frame and return the offset to draw with
    pub fn advance(&mut self, content_height: u32, visible_height: u32) -> u32 {
        if content_height <= visible_height {
            self.offset = 0;
            return 0;
        }

        let max_scroll = content_height - visible_height;
        // Content may have shrunk since the last frame
        self.offset = self.offset.min(max_scroll);

        if self.pause_remaining > 0 {
            self.pause_remaining -= 1;
            return self.offset;
        }

        if self.direction > 0 {
            self.offset += 1;
            if self.offset >= max_scroll {
                self.offset = max_scroll;
                self.direction = -1;
                self.pause_remaining = self.pause_ticks;
            }
        } else {
            self.offset = self.offset.saturating_sub(1);
            if self.offset == 0 {
                self.direction = 1;
                self.pause_remaining = self.pause_ticks;
            }
        }

        self.offset
    }
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new(DEFAULT_PAUSE_TICKS)
    }
}

/// Horizontal marquee offset after `elapsed`
///
/// The line scrolls left at `px_per_sec` and repeats every
/// `text_width + gap` pixels.
pub fn marquee_offset(elapsed: Duration, px_per_sec: u32, text_width: u32, gap: u32) -> u32 {
    let period = u64::from(text_width) + u64::from(gap);
    if period == 0 {
        return 0;
    }
    let travelled = elapsed.as_millis() as u64 * u64::from(px_per_sec) / 1000;
    (travelled % period) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_that_fits_stays_at_zero() {
        let mut state = ScrollState::new(0);
        for _ in 0..10 {
            assert_eq!(state.advance(100, 64), state.offset());
        }
        assert!(state.offset() > 0);

        assert_eq!(state.advance(64, 64), 0);
        assert_eq!(state.advance(10, 64), 0);
        assert_eq!(state.offset(), 0);
    }

    #[test]
    fn test_initial_pause() {
        let mut state = ScrollState::new(3);
        assert_eq!(state.advance(100, 64), 0);
        assert_eq!(state.advance(100, 64), 0);
        assert_eq!(state.advance(100, 64), 0);
        assert!(!state.is_paused());
        assert_eq!(state.advance(100, 64), 1);
    }

    #[test]
    fn test_flip_at_bottom_arms_pause() {
        let mut state = ScrollState::new(2);
        let mut last = 0;
        while state.direction() > 0 {
            last = state.advance(50, 40);
        }
        assert_eq!(last, 10);
        assert!(state.is_paused());

        assert_eq!(state.advance(50, 40), 10);
        assert_eq!(state.advance(50, 40), 10);
        assert_eq!(state.advance(50, 40), 9);
    }

    #[test]
    fn test_full_bounce_cycle() {
        let mut state = ScrollState::new(3);
        let offsets: Vec<u32> = (0..200).map(|_| state.advance(100, 64)).collect();

        assert!(offsets.iter().all(|&o| o <= 36));

        // Pause at the top, climb one pixel per tick, pause at the bottom
        assert_eq!(offsets[0..3], [0, 0, 0]);
        assert_eq!(offsets[3..39], (1..=36).collect::<Vec<_>>()[..]);
        assert_eq!(offsets[39..42], [36, 36, 36]);

        // Fall back to the top, pause again, then climb
        assert_eq!(offsets[42..78], (0..=35).rev().collect::<Vec<_>>()[..]);
        assert_eq!(offsets[78..81], [0, 0, 0]);
        assert_eq!(offsets[81], 1);
        assert_eq!(offsets[81..117], offsets[3..39]);
    }

    #[test]
    fn test_offset_clamped_when_content_shrinks() {
        let mut state = ScrollState::new(0);
        for _ in 0..30 {
            state.advance(100, 64);
        }
        assert_eq!(state.offset(), 30);
        assert!(state.advance(70, 64) <= 6);
    }

    #[test]
    fn test_reset() {
        let mut state = ScrollState::new(5);
        for _ in 0..20 {
            state.advance(100, 64);
        }
        state.reset();
        assert_eq!(state, ScrollState::new(5));
    }

    #[test]
    fn test_marquee_offset() {
        // 24 px/s, 100 px text, 24 px gap -> period 124
        assert_eq!(marquee_offset(Duration::ZERO, 24, 100, 24), 0);
        assert_eq!(marquee_offset(Duration::from_millis(500), 24, 100, 24), 12);
        assert_eq!(marquee_offset(Duration::from_secs(5), 24, 100, 24), 120);
        assert_eq!(marquee_offset(Duration::from_secs(6), 24, 100, 24), 20);
        assert_eq!(marquee_offset(Duration::from_secs(6), 24, 0, 0), 0);
    }
}
