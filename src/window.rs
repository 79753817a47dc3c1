//! Visible-window scheduling
//!
//! Each page reports visibility transitions from an intersection observer;
//! the tracker folds them into the set of pages that should actually
//! render: every visible page plus its immediate neighbors. This window is
//! the only driver of which pages are mounted into active rendering.

use std::collections::BTreeSet;

/// Fraction of a page that must intersect the viewport before it counts
/// as visible. Applied by the host's intersection observer.
pub const INTERSECTION_THRESHOLD: f32 = 0.1;

/// How the render window changed after one visibility transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowDelta {
    pub entered: Vec<u32>,
    pub left: Vec<u32>,
}

impl WindowDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

/// Tracks visible page numbers (1-indexed) and derives the render window.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    visible: BTreeSet<u32>,
    page_count: u32,
}

impl VisibilityTracker {
    #[must_use]
    pub fn new(page_count: u32) -> Self {
        Self {
            visible: BTreeSet::new(),
            page_count,
        }
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Update the page count (document reload), dropping visibility state
    /// for pages that no longer exist.
    pub fn set_page_count(&mut self, page_count: u32) -> WindowDelta {
        let before = self.window();
        self.page_count = page_count;
        self.visible.retain(|&p| p >= 1 && p <= page_count);
        self.delta(&before)
    }

    #[must_use]
    pub fn is_visible(&self, page: u32) -> bool {
        self.visible.contains(&page)
    }

    #[must_use]
    pub fn visible_pages(&self) -> &BTreeSet<u32> {
        &self.visible
    }

    /// Apply one intersection transition and report the window change.
    pub fn set_visible(&mut self, page: u32, visible: bool) -> WindowDelta {
        if page < 1 || page > self.page_count {
            return WindowDelta::default();
        }
        let before = self.window();
        let changed = if visible {
            self.visible.insert(page)
        } else {
            self.visible.remove(&page)
        };
        if !changed {
            return WindowDelta::default();
        }
        self.delta(&before)
    }

    /// The render window: union over visible pages p of {p-1, p, p+1},
    /// clipped to [1, page_count].
    #[must_use]
    pub fn window(&self) -> BTreeSet<u32> {
        let mut window = BTreeSet::new();
        for &page in &self.visible {
            for candidate in [page.saturating_sub(1), page, page + 1] {
                if candidate >= 1 && candidate <= self.page_count {
                    window.insert(candidate);
                }
            }
        }
        window
    }

    #[must_use]
    pub fn in_window(&self, page: u32) -> bool {
        self.window().contains(&page)
    }

    fn delta(&self, before: &BTreeSet<u32>) -> WindowDelta {
        let after = self.window();
        WindowDelta {
            entered: after.difference(before).copied().collect(),
            left: before.difference(&after).copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(tracker: &VisibilityTracker) -> Vec<u32> {
        tracker.window().into_iter().collect()
    }

    #[test]
    fn window_includes_neighbors() {
        let mut tracker = VisibilityTracker::new(10);
        tracker.set_visible(5, true);
        assert_eq!(window_of(&tracker), vec![4, 5, 6]);
    }

    #[test]
    fn window_clips_to_document_bounds() {
        let mut tracker = VisibilityTracker::new(3);
        tracker.set_visible(1, true);
        assert_eq!(window_of(&tracker), vec![1, 2]);

        tracker.set_visible(3, true);
        assert_eq!(window_of(&tracker), vec![1, 2, 3]);
    }

    #[test]
    fn delta_reports_entered_and_left() {
        let mut tracker = VisibilityTracker::new(10);
        let delta = tracker.set_visible(5, true);
        assert_eq!(delta.entered, vec![4, 5, 6]);
        assert!(delta.left.is_empty());

        let delta = tracker.set_visible(6, true);
        assert_eq!(delta.entered, vec![7]);
        assert!(delta.left.is_empty());

        let delta = tracker.set_visible(5, false);
        assert_eq!(delta.entered, Vec::<u32>::new());
        assert_eq!(delta.left, vec![4]);
    }

    #[test]
    fn redundant_transitions_are_noops() {
        let mut tracker = VisibilityTracker::new(10);
        tracker.set_visible(2, true);
        assert!(tracker.set_visible(2, true).is_empty());
        assert!(tracker.set_visible(7, false).is_empty());
    }

    #[test]
    fn out_of_range_pages_are_ignored() {
        let mut tracker = VisibilityTracker::new(4);
        assert!(tracker.set_visible(0, true).is_empty());
        assert!(tracker.set_visible(5, true).is_empty());
        assert!(tracker.window().is_empty());
    }

    #[test]
    fn shrinking_page_count_drops_stale_visibility() {
        let mut tracker = VisibilityTracker::new(10);
        tracker.set_visible(9, true);
        let delta = tracker.set_page_count(5);
        assert_eq!(delta.left, vec![8, 9, 10]);
        assert!(tracker.window().is_empty());
    }
}
