//! Rendering backend contract for overlay layers
//!
//! The backend paints the selectable-text layer and the annotation layer
//! into the host surface. Both passes are async but expose no cancel
//! operation; superseded work is suppressed purely by the orchestrator's
//! post-await generation checks.

use async_trait::async_trait;

use crate::error::RenderFault;
use crate::events::{EventSender, ViewerEvent};
use crate::geometry::Viewport;
use crate::provider::{Annotation, LinkTarget, PageHandle, TextContent};
use crate::surface::PageSurface;

/// Routes link activations from the annotation layer to the event bus.
#[derive(Clone)]
pub struct LinkProxy {
    events: EventSender,
}

impl LinkProxy {
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    pub fn activate(&self, target: &LinkTarget) {
        match target {
            LinkTarget::Internal { page } => self.internal_link(*page),
            LinkTarget::External { uri } => self.external_link(uri.clone()),
        }
    }

    pub fn internal_link(&self, page: u32) {
        self.events.emit(ViewerEvent::InternalLinkClicked { page });
    }

    pub fn external_link(&self, uri: impl Into<String>) {
        self.events.emit(ViewerEvent::ExternalLinkClicked { uri: uri.into() });
    }
}

pub struct TextLayerParams<'a> {
    pub surface: &'a dyn PageSurface,
    pub content: &'a TextContent,
    /// CSS-space viewport aligned with the displayed page size.
    pub viewport: &'a Viewport,
}

pub struct AnnotationLayerParams<'a> {
    pub surface: &'a dyn PageSurface,
    pub page: &'a dyn PageHandle,
    /// CSS-space viewport aligned with the displayed page size.
    pub viewport: &'a Viewport,
    pub annotations: &'a [Annotation],
    pub links: &'a LinkProxy,
    pub image_resources_path: &'a str,
    /// Always false: interactive widgets are represented by the separate
    /// non-interactive form overlay instead.
    pub render_forms: bool,
}

#[async_trait(?Send)]
pub trait OverlayBackend {
    async fn render_text_layer(&self, params: TextLayerParams<'_>) -> Result<(), RenderFault>;

    async fn render_annotation_layer(
        &self,
        params: AnnotationLayerParams<'_>,
    ) -> Result<(), RenderFault>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    #[test]
    fn link_proxy_routes_targets() {
        let bus = EventBus::new();
        let proxy = LinkProxy::new(bus.sender());

        proxy.activate(&LinkTarget::Internal { page: 7 });
        proxy.activate(&LinkTarget::External {
            uri: "https://example.org".to_string(),
        });

        let events = bus.drain();
        assert!(matches!(events[0], ViewerEvent::InternalLinkClicked { page: 7 }));
        assert!(
            matches!(&events[1], ViewerEvent::ExternalLinkClicked { uri } if uri == "https://example.org")
        );
    }
}
