//! Document-level view driver
//!
//! Owns one render orchestrator per mounted page and translates
//! visibility transitions, prop updates and layout ticks into render
//! work. Pages are mounted eagerly (the host creates one surface per
//! page) but rendered lazily: only pages inside the visible window ever
//! reach the provider.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::trace;

use crate::backend::OverlayBackend;
use crate::config::ViewerConfig;
use crate::events::{EventBus, ViewerEvent};
use crate::page::{
    ContainerId, LayoutAction, LayoutReactor, LayoutState, PageProps, PageRenderer, PropsAction,
    RenderOutcome,
};
use crate::provider::DocumentProvider;
use crate::surface::PageSurface;
use crate::textract::TextMeasurer;
use crate::window::VisibilityTracker;

struct PageSlot {
    renderer: Rc<PageRenderer>,
    reactor: LayoutReactor,
}

/// Viewer state for one document.
pub struct DocumentView {
    config: ViewerConfig,
    provider: Rc<dyn DocumentProvider>,
    backend: Rc<dyn OverlayBackend>,
    measurer: Rc<dyn TextMeasurer>,
    events: EventBus,
    tracker: VisibilityTracker,
    pages: BTreeMap<u32, PageSlot>,
}

impl DocumentView {
    #[must_use]
    pub fn new(
        config: ViewerConfig,
        provider: Rc<dyn DocumentProvider>,
        backend: Rc<dyn OverlayBackend>,
        measurer: Rc<dyn TextMeasurer>,
    ) -> Self {
        let tracker = VisibilityTracker::new(provider.page_count());
        Self {
            config,
            provider,
            backend,
            measurer,
            events: EventBus::new(),
            tracker,
            pages: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drain pending events; hosts poll this once per frame.
    pub fn drain_events(&self) -> Vec<ViewerEvent> {
        self.events.drain()
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.tracker.page_count()
    }

    #[must_use]
    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    /// Mount a page with its host surface. Mounting never renders; the
    /// page renders when the visible window first reaches it.
    pub fn mount_page(&mut self, props: PageProps, surface: Rc<dyn PageSurface>) -> Rc<PageRenderer> {
        let number = props.page_number;
        let layout = Rc::new(LayoutState::new());
        let renderer = Rc::new(PageRenderer::new(
            self.config.clone(),
            props,
            Rc::clone(&layout),
            Rc::clone(&self.provider),
            Rc::clone(&self.backend),
            surface,
            Rc::clone(&self.measurer),
            self.events.sender(),
        ));
        let slot = PageSlot {
            renderer: Rc::clone(&renderer),
            reactor: LayoutReactor::new(layout),
        };
        self.pages.insert(number, slot);
        renderer
    }

    /// Destroy and remove a page's orchestrator.
    pub fn unmount_page(&mut self, number: u32) {
        if let Some(slot) = self.pages.remove(&number) {
            slot.renderer.destroy();
        }
    }

    #[must_use]
    pub fn renderer(&self, number: u32) -> Option<&Rc<PageRenderer>> {
        self.pages.get(&number).map(|slot| &slot.renderer)
    }

    /// One intersection-observer transition for a page. Pages leaving the
    /// window are cleaned up; pages entering it render.
    pub async fn set_page_visibility(&mut self, page: u32, visible: bool) {
        self.events
            .sender()
            .emit(ViewerEvent::VisibilityChanged { page, visible });

        let delta = self.tracker.set_visible(page, visible);
        if delta.is_empty() {
            return;
        }
        trace!("window delta: entered {:?}, left {:?}", delta.entered, delta.left);

        for left in &delta.left {
            if let Some(slot) = self.pages.get(left) {
                slot.renderer.cleanup();
            }
        }
        for entered in delta.entered {
            let Some(renderer) = self.pages.get(&entered).map(|s| Rc::clone(&s.renderer)) else {
                continue;
            };
            let outcome = renderer.render_page().await;
            self.note_outcome(entered, outcome);
        }
    }

    /// Replace a page's props. Signals for pages outside the render
    /// window change state only; no render work runs for them.
    pub async fn update_page_props(&mut self, page: u32, props: PageProps) {
        let Some(slot) = self.pages.get(&page) else {
            return;
        };
        let action = slot.renderer.update_props(props);
        if !self.tracker.in_window(page) {
            return;
        }
        let renderer = Rc::clone(&slot.renderer);
        match action {
            PropsAction::None => {}
            PropsAction::Rerender => {
                renderer.cleanup();
                let outcome = renderer.render_page().await;
                self.note_outcome(page, outcome);
            }
            PropsAction::TextLayerOnly => {
                let _ = renderer.render_text_layer_only().await;
            }
        }
    }

    /// Track the effective container element for a page. Returns true
    /// when a previous observer must be torn down and rebound.
    pub fn observe_container(&mut self, page: u32, container: ContainerId) -> bool {
        self.pages
            .get_mut(&page)
            .is_some_and(|slot| slot.reactor.observe(container))
    }

    /// One resize observation for a page's container. Returns true when a
    /// recompute was newly scheduled for the next frame.
    pub fn on_container_resize(&mut self, page: u32, width: f32, height: f32) -> bool {
        self.pages
            .get_mut(&page)
            .is_some_and(|slot| slot.reactor.on_resize(width, height))
    }

    /// Animation-frame tick for a page: runs the coalesced layout
    /// recompute or the armed zero-dimension retry, if any.
    pub async fn on_frame(&mut self, page: u32) {
        let in_window = self.tracker.in_window(page);
        let Some(slot) = self.pages.get_mut(&page) else {
            return;
        };
        let action = slot.reactor.on_frame(in_window);
        let renderer = Rc::clone(&slot.renderer);

        match action {
            None => {}
            Some(LayoutAction::Resize { width, height }) => {
                renderer.apply_css_size(width, height);
            }
            Some(LayoutAction::Rerender { .. }) => {
                renderer.cleanup();
                let outcome = renderer.render_page().await;
                self.note_outcome(page, outcome);
            }
            Some(LayoutAction::RetryRender) => {
                let outcome = renderer.render_page().await;
                // One retry per attempt: a second zero result stays idle
                // until an external resize or visibility signal.
                if outcome == RenderOutcome::ZeroDimensions {
                    trace!("page {page}: still unmeasurable after retry");
                }
            }
        }
    }

    fn note_outcome(&mut self, page: u32, outcome: RenderOutcome) {
        if outcome == RenderOutcome::ZeroDimensions {
            if let Some(slot) = self.pages.get_mut(&page) {
                slot.reactor.arm_zero_retry();
            }
        }
    }
}
