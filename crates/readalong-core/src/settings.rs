//! Tuning knobs for layout and the autoscroll loop.
//!
//! All lengths are layout units. One terminal row is `line_height` units, so
//! the defaults keep the feel of pixel-tuned values: 0.5 units per
//! 60 Hz frame is roughly one and a quarter rows per second at speed 1.0.

use std::time::Duration;

pub const DEFAULT_LINE_HEIGHT: f64 = 24.0;
pub const DEFAULT_BASE_RATE: f64 = 0.5;
pub const DEFAULT_RESYNC_TOLERANCE: f64 = 20.0;
pub const DEFAULT_LOOKAHEAD: f64 = 120.0;
pub const DEFAULT_MANUAL_SCROLL_MARGIN: f64 = 100.0;
pub const DEFAULT_END_TOLERANCE: f64 = 5.0;
pub const DEFAULT_JUMP_OFFSET: f64 = 20.0;
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_CHAPTER_SCAN_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_SMOOTH_SCROLL: Duration = Duration::from_millis(300);

/// Reference frame length that `base_rate` is calibrated against (60 Hz).
pub const NOMINAL_FRAME: Duration = Duration::from_micros(16_670);
/// Frame gaps longer than this are treated as a single nominal frame.
pub const MAX_FRAME_GAP: Duration = Duration::from_millis(100);

pub const DEFAULT_SPEED: f64 = 1.0;
pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 5.0;
pub const SPEED_STEP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorSettings {
    pub line_height: f64,
    /// Units per nominal frame at speed 1.0.
    pub base_rate: f64,
    pub nominal_frame: Duration,
    pub max_frame_gap: Duration,
    /// Drift between the real and tracked offset above which the loop
    /// assumes the user scrolled by hand.
    pub resync_tolerance: f64,
    pub lookahead: f64,
    pub manual_scroll_margin: f64,
    pub end_tolerance: f64,
    pub jump_offset: f64,
    pub advance_delay: Duration,
    pub chapter_scan_interval: Duration,
    pub smooth_scroll: Duration,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT,
            base_rate: DEFAULT_BASE_RATE,
            nominal_frame: NOMINAL_FRAME,
            max_frame_gap: MAX_FRAME_GAP,
            resync_tolerance: DEFAULT_RESYNC_TOLERANCE,
            lookahead: DEFAULT_LOOKAHEAD,
            manual_scroll_margin: DEFAULT_MANUAL_SCROLL_MARGIN,
            end_tolerance: DEFAULT_END_TOLERANCE,
            jump_offset: DEFAULT_JUMP_OFFSET,
            advance_delay: DEFAULT_ADVANCE_DELAY,
            chapter_scan_interval: DEFAULT_CHAPTER_SCAN_INTERVAL,
            smooth_scroll: DEFAULT_SMOOTH_SCROLL,
        }
    }
}

pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return DEFAULT_SPEED;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

/// Move `speed` by `steps` increments of `SPEED_STEP`, landing on one
/// decimal place so repeated steps never drift.
pub fn step_speed(speed: f64, steps: i32) -> f64 {
    let stepped = speed + f64::from(steps) * SPEED_STEP;
    clamp_speed((stepped * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_speed() {
        assert_eq!(clamp_speed(0.0), MIN_SPEED);
        assert_eq!(clamp_speed(9.0), MAX_SPEED);
        assert_eq!(clamp_speed(f64::NAN), DEFAULT_SPEED);
        assert_eq!(clamp_speed(1.25), 1.25);
    }

    #[test]
    fn test_step_speed_lands_on_tenths() {
        assert_eq!(step_speed(0.1 + 0.2, 0), 0.3);
        assert_eq!(step_speed(1.25, 1), 1.4);
        assert_eq!(step_speed(1.0, -1), 0.9);
        assert_eq!(step_speed(MAX_SPEED, 1), MAX_SPEED);
        assert_eq!(step_speed(MIN_SPEED, -1), MIN_SPEED);
    }
}
