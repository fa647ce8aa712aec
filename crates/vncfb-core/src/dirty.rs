//! Coarse dirty-rectangle tracking.
//!
//! Every change notification is folded into a single running bounding box. The poller takes (reads
//! and clears) the box on its own schedule. Both sides go through one mutex whose critical sections
//! are a handful of integer compares, so reporting is safe from batched writeback contexts.

use serde::{Deserialize, Serialize};

use crate::sync::{Mutex, MutexGuard};

/// Pixel rectangle with inclusive `x0`/`y0` and exclusive `x1`/`y1`.
///
/// The all-zero rectangle doubles as the "nothing changed" sentinel on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DirtyRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl DirtyRect {
    pub const EMPTY: Self = Self {
        x0: 0,
        y0: 0,
        x1: 0,
        y1: 0,
    };

    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Rectangle of `width`x`height` pixels starting at `(x, y)`.
    pub fn from_origin_size(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty()
            || (self.x0 <= other.x0
                && self.y0 <= other.y0
                && self.x1 >= other.x1
                && self.y1 >= other.y1)
    }

    /// Clips to `[0, width) x [0, height)`; `None` if nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let clamped = Self {
            x0: self.x0,
            y0: self.y0,
            x1: self.x1.min(width),
            y1: self.y1.min(height),
        };
        (!clamped.is_empty()).then_some(clamped)
    }
}

/// Accumulated change set as returned by [`DirtyTracker::take`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRegion {
    pub valid: bool,
    pub rect: DirtyRect,
}

impl DirtyRegion {
    pub const NONE: Self = Self {
        valid: false,
        rect: DirtyRect::EMPTY,
    };

    pub fn rect(&self) -> Option<DirtyRect> {
        self.valid.then_some(self.rect)
    }

    /// Rectangle form used by the control surface: all zeros when nothing is pending.
    pub fn to_reply(&self) -> DirtyRect {
        self.rect().unwrap_or(DirtyRect::EMPTY)
    }
}

#[derive(Debug)]
struct DirtyState {
    region: DirtyRegion,
    /// `(width, height)` of the installed buffer, `None` until the first mode set.
    bounds: Option<(u32, u32)>,
}

impl DirtyState {
    fn clamp_pending(&mut self) {
        if !self.region.valid {
            return;
        }
        let clamped = self
            .bounds
            .and_then(|(width, height)| self.region.rect.clamp_to(width, height));
        self.region = match clamped {
            Some(rect) => DirtyRegion { valid: true, rect },
            None => DirtyRegion::NONE,
        };
    }
}

pub struct DirtyTracker {
    state: Mutex<DirtyState>,
}

impl std::fmt::Debug for DirtyTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DirtyTracker")
            .field("region", &state.region)
            .field("bounds", &state.bounds)
            .finish()
    }
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DirtyState {
                region: DirtyRegion::NONE,
                bounds: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DirtyState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Installs the extent of a newly configured buffer.
    ///
    /// A pending rectangle is kept and gets clipped to the new extent on the next report or take.
    pub fn set_bounds(&self, width: u32, height: u32) {
        self.lock().bounds = Some((width, height));
    }

    pub fn bounds(&self) -> Option<(u32, u32)> {
        self.lock().bounds
    }

    pub fn report_changed_pixel_rect(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
        self.report(DirtyRect::new(x0, y0, x1, y1))
    }

    /// Grows the pending region to cover `rect`.
    ///
    /// Returns `false` if the rectangle was dropped: it was empty, lay entirely outside the current
    /// buffer, or no buffer has been configured yet.
    pub fn report(&self, rect: DirtyRect) -> bool {
        let mut state = self.lock();
        state.clamp_pending();

        let Some((width, height)) = state.bounds else {
            return false;
        };
        let Some(rect) = rect.clamp_to(width, height) else {
            tracing::trace!(?rect, width, height, "dropping out-of-range dirty rect");
            return false;
        };

        state.region = if state.region.valid {
            DirtyRegion {
                valid: true,
                rect: state.region.rect.union(&rect),
            }
        } else {
            DirtyRegion { valid: true, rect }
        };
        true
    }

    /// Returns the accumulated region and resets it to "no changes".
    pub fn take(&self) -> DirtyRegion {
        let mut state = self.lock();
        state.clamp_pending();
        std::mem::replace(&mut state.region, DirtyRegion::NONE)
    }

    pub fn is_pending(&self) -> bool {
        let mut state = self.lock();
        state.clamp_pending();
        state.region.valid
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    use std::sync::{Arc, Barrier};
    use std::thread;

    fn tracker(width: u32, height: u32) -> DirtyTracker {
        let tracker = DirtyTracker::new();
        tracker.set_bounds(width, height);
        tracker
    }

    #[test]
    fn take_without_reports_returns_the_sentinel() {
        let tracker = tracker(64, 64);
        assert_eq!(tracker.take(), DirtyRegion::NONE);
        assert_eq!(tracker.take().to_reply(), DirtyRect::EMPTY);
    }

    #[test]
    fn reports_merge_into_a_bounding_box() {
        let tracker = tracker(64, 64);
        assert!(tracker.report_changed_pixel_rect(0, 0, 4, 4));
        assert!(tracker.report_changed_pixel_rect(10, 10, 12, 12));

        let region = tracker.take();
        assert!(region.valid);
        assert_eq!(region.rect, DirtyRect::new(0, 0, 12, 12));
        assert_eq!(tracker.take(), DirtyRegion::NONE);
    }

    #[test]
    fn first_report_sets_the_region_exactly() {
        let tracker = tracker(64, 64);
        tracker.report_changed_pixel_rect(5, 6, 7, 8);
        assert_eq!(tracker.take().rect(), Some(DirtyRect::new(5, 6, 7, 8)));
    }

    #[test]
    fn reports_before_the_first_mode_set_are_dropped() {
        let tracker = DirtyTracker::new();
        assert!(!tracker.report_changed_pixel_rect(0, 0, 1, 1));
        assert_eq!(tracker.take(), DirtyRegion::NONE);
    }

    #[test]
    fn out_of_range_rows_are_ignored() {
        let tracker = tracker(640, 480);
        assert!(!tracker.report_changed_pixel_rect(0, 700, 10, 701));
        assert!(!tracker.is_pending());

        // Partially visible rectangles are clipped rather than dropped.
        assert!(tracker.report_changed_pixel_rect(600, 470, 700, 500));
        assert_eq!(tracker.take().rect(), Some(DirtyRect::new(600, 470, 640, 480)));
    }

    #[test]
    fn empty_and_inverted_rects_are_dropped() {
        let tracker = tracker(64, 64);
        assert!(!tracker.report_changed_pixel_rect(3, 3, 3, 9));
        assert!(!tracker.report_changed_pixel_rect(9, 9, 2, 2));
        assert!(!tracker.is_pending());
    }

    #[test]
    fn pending_region_survives_a_shrink_but_is_clipped() {
        let tracker = tracker(1024, 768);
        tracker.report_changed_pixel_rect(100, 100, 900, 700);

        tracker.set_bounds(640, 480);
        assert_eq!(tracker.take().rect(), Some(DirtyRect::new(100, 100, 640, 480)));
    }

    #[test]
    fn pending_region_entirely_outside_a_shrink_is_discarded() {
        let tracker = tracker(1024, 768);
        tracker.report_changed_pixel_rect(0, 700, 10, 710);

        tracker.set_bounds(640, 480);
        tracker.report_changed_pixel_rect(1, 1, 2, 2);
        assert_eq!(tracker.take().rect(), Some(DirtyRect::new(1, 1, 2, 2)));
    }

    #[test]
    fn concurrent_reports_are_never_lost_across_takes() {
        const WRITERS: u32 = 4;
        const REPORTS: u32 = 2_000;

        let tracker = Arc::new(tracker(4096, 4096));
        let start = Arc::new(Barrier::new(WRITERS as usize + 1));

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let tracker = tracker.clone();
                let start = start.clone();
                thread::spawn(move || {
                    start.wait();
                    for i in 0..REPORTS {
                        let x = (w * 997 + i * 13) % 4000;
                        let y = (w * 389 + i * 7) % 4000;
                        tracker.report(DirtyRect::from_origin_size(x, y, 3, 2));
                    }
                })
            })
            .collect();

        start.wait();
        let mut taken = Vec::new();
        while writers.iter().any(|h| !h.is_finished()) {
            if let Some(rect) = tracker.take().rect() {
                taken.push(rect);
            }
        }
        for writer in writers {
            writer.join().unwrap();
        }
        if let Some(rect) = tracker.take().rect() {
            taken.push(rect);
        }

        for w in 0..WRITERS {
            for i in 0..REPORTS {
                let x = (w * 997 + i * 13) % 4000;
                let y = (w * 389 + i * 7) % 4000;
                let reported = DirtyRect::from_origin_size(x, y, 3, 2);
                assert!(
                    taken.iter().any(|t| t.contains(&reported)),
                    "report {reported:?} missing from every take"
                );
            }
        }
    }
}
