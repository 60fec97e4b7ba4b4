use std::time::{Duration, Instant};

use crate::geometry::{Point, Rect};

pub const DEFAULT_HOVER_BUFFER: f64 = 100.0;
pub const DEFAULT_ANCHOR_RADIUS: f64 = 200.0;
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityConfig {
    pub buffer: f64,
    pub radius: f64,
    pub close_delay: Duration,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_HOVER_BUFFER,
            radius: DEFAULT_ANCHOR_RADIUS,
            close_delay: DEFAULT_CLOSE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    OverPopover,
    NearSelection,
    Away,
}

pub fn classify(pointer: Point, popover: Rect, anchor: Option<Point>, config: &ProximityConfig) -> Proximity {
    if popover.expand(config.buffer).contains(pointer) {
        return Proximity::OverPopover;
    }
    match anchor {
        Some(anchor) if pointer.distance_to(anchor) < config.radius => Proximity::NearSelection,
        _ => Proximity::Away,
    }
}

/// Close timer for an open popover. Never opens anything.
#[derive(Debug, Clone)]
pub struct ProximityTracker {
    config: ProximityConfig,
    close_deadline: Option<Instant>,
}

impl ProximityTracker {
    pub fn new(config: ProximityConfig) -> Self {
        Self {
            config,
            close_deadline: None,
        }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn pointer_moved(
        &mut self,
        pointer: Point,
        popover: Rect,
        anchor: Option<Point>,
        now: Instant,
    ) -> Proximity {
        let proximity = classify(pointer, popover, anchor, &self.config);
        match proximity {
            Proximity::OverPopover | Proximity::NearSelection => self.cancel(),
            Proximity::Away => {
                if self.close_deadline.is_none() {
                    tracing::debug!(x = pointer.x, y = pointer.y, "pointer left popover, close timer started");
                    self.close_deadline = Some(now + self.config.close_delay);
                }
            }
        }
        proximity
    }

    /// True once when the close timer has run out; the timer is consumed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.close_deadline {
            Some(deadline) if now >= deadline => {
                self.close_deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.close_deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.close_deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.close_deadline
    }
}

impl Default for ProximityTracker {
    fn default() -> Self {
        Self::new(ProximityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POPOVER: Rect = Rect::new(500.0, 500.0, 300.0, 100.0);
    const ANCHOR: Point = Point::new(500.0, 480.0);

    #[test]
    fn classify_prefers_the_buffered_box() {
        let config = ProximityConfig::default();
        assert_eq!(classify(Point::new(410.0, 550.0), POPOVER, None, &config), Proximity::OverPopover);
        assert_eq!(classify(Point::new(900.0, 700.0), POPOVER, None, &config), Proximity::OverPopover);
        assert_eq!(classify(Point::new(901.0, 700.0), POPOVER, None, &config), Proximity::Away);
    }

    #[test]
    fn classify_falls_back_to_the_anchor_radius() {
        let config = ProximityConfig::default();
        let near = Point::new(500.0, 281.0);
        let on_radius = Point::new(500.0, 280.0);

        assert_eq!(classify(near, POPOVER, Some(ANCHOR), &config), Proximity::NearSelection);
        assert_eq!(classify(on_radius, POPOVER, Some(ANCHOR), &config), Proximity::Away);
        assert_eq!(classify(near, POPOVER, None, &config), Proximity::Away);
    }

    #[test]
    fn pointer_inside_buffer_never_starts_the_timer() {
        let mut tracker = ProximityTracker::default();
        let now = Instant::now();
        for step in 0..50 {
            let pointer = Point::new(420.0 + f64::from(step) * 8.0, 420.0);
            tracker.pointer_moved(pointer, POPOVER, Some(ANCHOR), now);
            assert!(!tracker.is_pending());
        }
        assert!(!tracker.poll(now + Duration::from_secs(60)));
    }

    #[test]
    fn pointer_away_for_the_full_delay_closes() {
        let mut tracker = ProximityTracker::default();
        let start = Instant::now();
        let far = Point::new(1500.0, 1500.0);

        tracker.pointer_moved(far, POPOVER, Some(ANCHOR), start);
        tracker.pointer_moved(far, POPOVER, Some(ANCHOR), start + Duration::from_millis(600));
        assert_eq!(tracker.deadline(), Some(start + DEFAULT_CLOSE_DELAY));

        assert!(!tracker.poll(start + Duration::from_millis(999)));
        assert!(tracker.poll(start + DEFAULT_CLOSE_DELAY));
        assert!(!tracker.poll(start + Duration::from_secs(5)));
    }

    #[test]
    fn returning_near_cancels_the_timer() {
        let mut tracker = ProximityTracker::default();
        let start = Instant::now();

        tracker.pointer_moved(Point::new(1500.0, 1500.0), POPOVER, Some(ANCHOR), start);
        assert!(tracker.is_pending());

        let proximity = tracker.pointer_moved(
            Point::new(510.0, 470.0),
            POPOVER,
            Some(ANCHOR),
            start + Duration::from_millis(500),
        );
        assert_eq!(proximity, Proximity::OverPopover);
        assert!(!tracker.poll(start + Duration::from_secs(2)));
    }
}
