//! Container layout reaction
//!
//! Resize observations are coalesced to one recompute per animation frame.
//! The reactor also owns the single-shot retry used when a render attempt
//! found the container unmeasurable; that retry never reschedules itself,
//! so a container that never produces a size strands the page unrendered
//! until some external resize or visibility signal arrives.

use std::cell::Cell;
use std::rc::Rc;

use log::trace;

use crate::geometry;

/// Identity of a host container element, used to detect rebinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

/// Layout inputs shared between the reactor and the orchestrator.
#[derive(Debug, Default)]
pub struct LayoutState {
    container_width: Cell<f32>,
    container_height: Cell<f32>,
    requested_width: Cell<Option<f32>>,
    requested_height: Cell<Option<f32>>,
    /// Displayed height/width ratio cached from the last page measurement.
    ratio: Cell<Option<f32>>,
}

impl LayoutState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn container(&self) -> (f32, f32) {
        (self.container_width.get(), self.container_height.get())
    }

    pub fn set_container(&self, width: f32, height: f32) {
        self.container_width.set(width);
        self.container_height.set(height);
    }

    #[must_use]
    pub fn requested(&self) -> (Option<f32>, Option<f32>) {
        (self.requested_width.get(), self.requested_height.get())
    }

    pub fn set_requested(&self, width: Option<f32>, height: Option<f32>) {
        self.requested_width.set(width);
        self.requested_height.set(height);
    }

    /// Explicit height without a width: container width is not an input.
    #[must_use]
    pub fn height_driven(&self) -> bool {
        self.requested_height.get().is_some() && self.requested_width.get().is_none()
    }

    #[must_use]
    pub fn ratio(&self) -> Option<f32> {
        self.ratio.get()
    }

    pub fn set_ratio(&self, ratio: f32) {
        self.ratio.set(Some(ratio));
    }

    /// Resolve CSS dimensions from the cached ratio and current
    /// constraints. (0, 0) while unmeasurable.
    #[must_use]
    pub fn resolve_css(&self) -> (f32, f32) {
        let Some(ratio) = self.ratio.get() else {
            return (0.0, 0.0);
        };
        let (width, height) = self.requested();
        geometry::dimensions(ratio, self.container_width.get(), width, height)
    }
}

/// What the host must do after a reactor tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LayoutAction {
    /// Apply the recomputed CSS size; the page is outside the render
    /// window so no render cycle is due.
    Resize { width: f32, height: f32 },
    /// Apply the CSS size and run a full cleanup + render cycle.
    Rerender { width: f32, height: f32 },
    /// Re-run the render attempt that previously resolved to zero.
    RetryRender,
}

/// Per-page resize reaction and retry bookkeeping.
pub struct LayoutReactor {
    layout: Rc<LayoutState>,
    observed: Option<ContainerId>,
    frame_pending: bool,
    retry_armed: bool,
}

impl LayoutReactor {
    #[must_use]
    pub fn new(layout: Rc<LayoutState>) -> Self {
        Self {
            layout,
            observed: None,
            frame_pending: false,
            retry_armed: false,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Rc<LayoutState> {
        &self.layout
    }

    /// Track the effective container. Returns true when an observer was
    /// already bound to a different element and must be torn down before
    /// observing the new one.
    pub fn observe(&mut self, container: ContainerId) -> bool {
        if self.observed == Some(container) {
            return false;
        }
        let rebind = self.observed.is_some();
        self.observed = Some(container);
        if rebind {
            trace!("layout observer rebound to container {container:?}");
        }
        rebind
    }

    #[must_use]
    pub fn observed(&self) -> Option<ContainerId> {
        self.observed
    }

    /// One resize observation. Returns true when a recompute was newly
    /// scheduled for the next frame; repeated observations within the
    /// same frame coalesce.
    pub fn on_resize(&mut self, width: f32, height: f32) -> bool {
        if self.layout.height_driven() {
            return false;
        }
        self.layout.set_container(width, height);
        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// Arm the one-shot retry after a render attempt resolved to zero
    /// dimensions. At most one retry fires per attempt.
    pub fn arm_zero_retry(&mut self) {
        self.retry_armed = true;
    }

    #[must_use]
    pub fn retry_armed(&self) -> bool {
        self.retry_armed
    }

    /// Animation-frame tick. A pending resize recompute takes precedence
    /// and absorbs any armed retry, since the full cycle it triggers
    /// subsumes it.
    pub fn on_frame(&mut self, in_window: bool) -> Option<LayoutAction> {
        if self.frame_pending {
            self.frame_pending = false;
            self.retry_armed = false;
            let (width, height) = self.layout.resolve_css();
            if width <= 0.0 || height <= 0.0 {
                return None;
            }
            return Some(if in_window {
                LayoutAction::Rerender { width, height }
            } else {
                LayoutAction::Resize { width, height }
            });
        }
        if self.retry_armed {
            self.retry_armed = false;
            return Some(LayoutAction::RetryRender);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reactor_with_ratio(ratio: f32) -> LayoutReactor {
        let layout = Rc::new(LayoutState::new());
        layout.set_ratio(ratio);
        LayoutReactor::new(layout)
    }

    #[test]
    fn resize_coalesces_to_one_frame() {
        let mut reactor = reactor_with_ratio(1.5);
        assert!(reactor.on_resize(300.0, 600.0));
        assert!(!reactor.on_resize(320.0, 600.0));
        assert!(!reactor.on_resize(340.0, 600.0));

        let action = reactor.on_frame(true);
        assert_eq!(
            action,
            Some(LayoutAction::Rerender {
                width: 340.0,
                height: 510.0
            })
        );
        assert_eq!(reactor.on_frame(true), None);
    }

    #[test]
    fn out_of_window_resize_only_applies_css() {
        let mut reactor = reactor_with_ratio(2.0);
        reactor.on_resize(100.0, 50.0);
        assert_eq!(
            reactor.on_frame(false),
            Some(LayoutAction::Resize {
                width: 100.0,
                height: 200.0
            })
        );
    }

    #[test]
    fn height_driven_pages_ignore_container_resizes() {
        let layout = Rc::new(LayoutState::new());
        layout.set_ratio(1.0);
        layout.set_requested(None, Some(400.0));
        let mut reactor = LayoutReactor::new(layout);

        assert!(!reactor.on_resize(300.0, 600.0));
        assert_eq!(reactor.on_frame(true), None);
    }

    #[test]
    fn zero_retry_fires_once() {
        let mut reactor = reactor_with_ratio(1.0);
        reactor.arm_zero_retry();
        assert_eq!(reactor.on_frame(true), Some(LayoutAction::RetryRender));
        assert_eq!(reactor.on_frame(true), None);
    }

    #[test]
    fn resize_recompute_absorbs_armed_retry() {
        let mut reactor = reactor_with_ratio(1.0);
        reactor.arm_zero_retry();
        reactor.on_resize(200.0, 100.0);
        assert_eq!(
            reactor.on_frame(true),
            Some(LayoutAction::Rerender {
                width: 200.0,
                height: 200.0
            })
        );
        assert_eq!(reactor.on_frame(true), None);
    }

    #[test]
    fn unmeasurable_recompute_produces_nothing() {
        let layout = Rc::new(LayoutState::new());
        let mut reactor = LayoutReactor::new(layout);
        reactor.on_resize(0.0, 0.0);
        assert_eq!(reactor.on_frame(true), None);
    }

    #[test]
    fn observer_rebinds_on_identity_change() {
        let mut reactor = reactor_with_ratio(1.0);
        assert!(!reactor.observe(ContainerId(1)));
        assert!(!reactor.observe(ContainerId(1)));
        assert!(reactor.observe(ContainerId(2)));
        assert_eq!(reactor.observed(), Some(ContainerId(2)));
    }
}
