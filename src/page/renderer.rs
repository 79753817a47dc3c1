//! Per-page render orchestration
//!
//! A generation-based state machine that fetches page geometry, issues a
//! cancellable raster render and races the overlay passes against it. Any
//! attempt superseded by a newer one (or by cleanup) observes a stale
//! generation at its next suspension point and drops all surface writes,
//! so the most recently issued attempt always wins.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, warn};

use crate::backend::{AnnotationLayerParams, LinkProxy, OverlayBackend, TextLayerParams};
use crate::config::ViewerConfig;
use crate::error::RenderFault;
use crate::events::{EventSender, ViewerEvent};
use crate::forms;
use crate::generation::{Generation, GenerationCounter};
use crate::geometry::{self, Rotation, ScaleFactors, Viewport};
use crate::page::layout::LayoutState;
use crate::page::props::{PageProps, PropsAction, diff_props};
use crate::provider::{AnnotationIntent, DocumentProvider, PageHandle, RenderContext, RenderTask};
use crate::surface::PageSurface;
use crate::textract::{self, FontFitter, TextMeasurer, TextractBlock};

/// Lifecycle phase of the most recent render attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderPhase {
    #[default]
    Idle,
    FetchingPage,
    Measuring,
    Rendering,
    Rendered,
    Failed,
    Superseded,
}

/// Outcome of one orchestration call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Every requested pass completed and the surface was updated.
    Completed,
    /// A newer attempt took over; this one left no trace.
    Superseded,
    /// Geometry resolved to zero; the layout reactor arms one retry.
    ZeroDimensions,
    /// Destroyed page or missing canvas; nothing happened.
    Skipped,
    /// A pass failed; surfaced through the event bus.
    Failed,
}

/// Geometry derived once per attempt and shared by all passes.
struct ResolvedGeometry {
    css_width: f32,
    css_height: f32,
    effective_rotation: Rotation,
    raster_viewport: Viewport,
    overlay_viewport: Viewport,
    factors: ScaleFactors,
}

/// Orchestrates rendering for a single page.
pub struct PageRenderer {
    config: ViewerConfig,
    props: RefCell<PageProps>,
    layout: Rc<LayoutState>,
    provider: Rc<dyn DocumentProvider>,
    backend: Rc<dyn OverlayBackend>,
    surface: Rc<dyn PageSurface>,
    fitter: RefCell<FontFitter>,
    links: LinkProxy,
    events: EventSender,
    raster_generation: GenerationCounter,
    text_generation: GenerationCounter,
    page: RefCell<Option<Rc<dyn PageHandle>>>,
    raster_task: RefCell<Option<Box<dyn RenderTask>>>,
    destroyed: Cell<bool>,
    phase: Cell<RenderPhase>,
}

impl PageRenderer {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        config: ViewerConfig,
        props: PageProps,
        layout: Rc<LayoutState>,
        provider: Rc<dyn DocumentProvider>,
        backend: Rc<dyn OverlayBackend>,
        surface: Rc<dyn PageSurface>,
        measurer: Rc<dyn TextMeasurer>,
        events: EventSender,
    ) -> Self {
        layout.set_requested(props.width, props.height);
        let fitter = FontFitter::new(measurer, config.font_cache_size);
        Self {
            links: LinkProxy::new(events.clone()),
            config,
            props: RefCell::new(props),
            layout,
            provider,
            backend,
            surface,
            fitter: RefCell::new(fitter),
            events,
            raster_generation: GenerationCounter::new(),
            text_generation: GenerationCounter::new(),
            page: RefCell::new(None),
            raster_task: RefCell::new(None),
            destroyed: Cell::new(false),
            phase: Cell::new(RenderPhase::Idle),
        }
    }

    #[must_use]
    pub fn props(&self) -> PageProps {
        self.props.borrow().clone()
    }

    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.props.borrow().page_number
    }

    #[must_use]
    pub fn phase(&self) -> RenderPhase {
        self.phase.get()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    #[must_use]
    pub fn layout(&self) -> &Rc<LayoutState> {
        &self.layout
    }

    /// Replace the props and classify the work the change implies. The
    /// caller applies the action; nothing renders from here.
    pub fn update_props(&self, new: PageProps) -> PropsAction {
        let action = {
            let old = self.props.borrow();
            diff_props(&old, &new)
        };
        self.layout.set_requested(new.width, new.height);
        *self.props.borrow_mut() = new;
        action
    }

    /// Apply a CSS size without rendering, for layout updates of pages
    /// outside the render window.
    pub fn apply_css_size(&self, width: f32, height: f32) {
        self.surface.set_css_size(width, height);
    }

    /// Full render cycle: fetch the page handle, resolve geometry, size
    /// and clear the canvas, then race raster, text and annotation/form
    /// passes. Safe to call repeatedly; earlier attempts are superseded.
    pub async fn render_page(&self) -> RenderOutcome {
        if self.destroyed.get() {
            return RenderOutcome::Skipped;
        }
        let generation = self.raster_generation.advance();
        let number = self.props.borrow().page_number;
        self.phase.set(RenderPhase::FetchingPage);
        if self.config.log_renders {
            debug!("page {number}: render start ({generation:?})");
        }

        let page = match self.provider.page(number).await {
            Ok(page) => page,
            Err(fault) => return self.fail(number, fault),
        };
        if !self.pass_current(generation, &self.raster_generation) {
            self.phase.set(RenderPhase::Superseded);
            return RenderOutcome::Superseded;
        }
        *self.page.borrow_mut() = Some(Rc::clone(&page));

        self.phase.set(RenderPhase::Measuring);
        let Some(geom) = self.resolve_geometry(page.as_ref()) else {
            self.phase.set(RenderPhase::Idle);
            if self.config.log_renders {
                debug!("page {number}: container not measurable yet");
            }
            return RenderOutcome::ZeroDimensions;
        };

        let Some(canvas) = self.surface.canvas() else {
            self.phase.set(RenderPhase::Idle);
            return RenderOutcome::Skipped;
        };

        self.surface.set_css_size(geom.css_width, geom.css_height);
        self.surface.set_scale_factors(geom.factors);

        // Size the backing store first so no stale pixels survive into
        // this attempt.
        canvas.set_pixel_size(
            geom.raster_viewport.width.round() as u32,
            geom.raster_viewport.height.round() as u32,
        );
        canvas.clear();

        self.cancel_raster_task();
        let mut task = page.render(RenderContext {
            canvas,
            viewport: geom.raster_viewport.clone(),
        });
        let raster_done = task.completion();
        *self.raster_task.borrow_mut() = Some(task);

        self.phase.set(RenderPhase::Rendering);

        let (text_layer, annotation_layer, form_layer, blocks) = {
            let props = self.props.borrow();
            (
                props.text_layer,
                props.annotation_layer,
                props.form_layer,
                props.textract_blocks.clone(),
            )
        };

        let raster_pass = async { raster_done.await };
        let text_pass = async {
            if !text_layer {
                return Ok(());
            }
            self.render_text_pass(
                page.as_ref(),
                &geom,
                generation,
                &self.raster_generation,
                blocks.as_deref(),
            )
            .await
        };
        let annotation_pass = async {
            if !annotation_layer && !form_layer {
                return Ok(());
            }
            self.render_annotation_pass(page.as_ref(), &geom, generation, annotation_layer, form_layer)
                .await
        };

        let result = futures::try_join!(raster_pass, text_pass, annotation_pass);

        if !self.pass_current(generation, &self.raster_generation) {
            self.phase.set(RenderPhase::Superseded);
            return RenderOutcome::Superseded;
        }

        match result {
            Ok(_) => {
                self.raster_task.borrow_mut().take();
                self.phase.set(RenderPhase::Rendered);
                if self.config.log_renders {
                    debug!("page {number}: rendered");
                }
                self.events.emit(ViewerEvent::Rendered {
                    page: number,
                    factors: geom.factors,
                });
                RenderOutcome::Completed
            }
            Err(fault) => self.fail(number, fault),
        }
    }

    /// Redraw only the selectable-text layer under its own generation,
    /// leaving raster and annotation layers untouched. Used when just the
    /// text-layer inputs changed.
    pub async fn render_text_layer_only(&self) -> RenderOutcome {
        if self.destroyed.get() {
            return RenderOutcome::Skipped;
        }
        let generation = self.text_generation.advance();
        let (number, text_layer, blocks) = {
            let props = self.props.borrow();
            (props.page_number, props.text_layer, props.textract_blocks.clone())
        };

        if !text_layer {
            self.surface.clear_text_layer();
            return RenderOutcome::Completed;
        }
        if self.config.log_renders {
            debug!("page {number}: text layer redraw ({generation:?})");
        }

        let page = match self.cached_or_fetched_page(number).await {
            Ok(page) => page,
            Err(fault) => return self.fail(number, fault),
        };
        if !self.pass_current(generation, &self.text_generation) {
            return RenderOutcome::Superseded;
        }

        let Some(geom) = self.resolve_geometry(page.as_ref()) else {
            return RenderOutcome::ZeroDimensions;
        };

        match self
            .render_text_pass(page.as_ref(), &geom, generation, &self.text_generation, blocks.as_deref())
            .await
        {
            Ok(()) if self.pass_current(generation, &self.text_generation) => {
                RenderOutcome::Completed
            }
            Ok(()) => RenderOutcome::Superseded,
            Err(fault) => self.fail(number, fault),
        }
    }

    /// Tear down all per-page render artifacts: advance both generations,
    /// cancel the raster task, release canvas memory, empty the overlay
    /// layers and drop the page handle. Idempotent.
    pub fn cleanup(&self) {
        self.raster_generation.advance();
        self.text_generation.advance();
        self.cancel_raster_task();
        if let Some(canvas) = self.surface.canvas() {
            canvas.set_pixel_size(0, 0);
        }
        self.surface.clear_text_layer();
        self.surface.clear_annotation_layer();
        self.surface.clear_form_layer();
        self.page.borrow_mut().take();
        self.phase.set(RenderPhase::Idle);
    }

    /// Cleanup and mark destroyed; every later call is a no-op.
    pub fn destroy(&self) {
        self.cleanup();
        self.destroyed.set(true);
    }

    fn pass_current(&self, generation: Generation, counter: &GenerationCounter) -> bool {
        !self.destroyed.get() && counter.is_current(generation)
    }

    fn cancel_raster_task(&self) {
        if let Some(mut task) = self.raster_task.borrow_mut().take() {
            task.cancel();
        }
    }

    fn resolve_geometry(&self, page: &dyn PageHandle) -> Option<ResolvedGeometry> {
        let props = self.props.borrow();
        let requested = Rotation::from_degrees(props.rotation);
        let effective = requested + page.rotation();

        let ratio = geometry::aspect_ratio(page.view(), effective);
        if ratio <= 0.0 {
            return None;
        }
        self.layout.set_ratio(ratio);

        let (container_width, _) = self.layout.container();
        let (css_width, css_height) =
            geometry::dimensions(ratio, container_width, props.width, props.height);
        if css_width <= 0.0 || css_height <= 0.0 {
            return None;
        }

        let user_scale = geometry::clamp_scale(props.scale);
        let base_viewport = page.viewport(user_scale, requested);
        let page_scale = geometry::page_scale(css_width, page.view(), effective);
        let raster_viewport =
            base_viewport.rescaled(page_scale * self.config.device_pixel_ratio * user_scale);
        let overlay_viewport = base_viewport.rescaled(page_scale).unflipped();

        Some(ResolvedGeometry {
            css_width,
            css_height,
            effective_rotation: effective,
            raster_viewport,
            overlay_viewport,
            factors: ScaleFactors {
                scale_factor: page_scale,
                user_unit: page.user_unit(),
                total_scale_factor: base_viewport.scale,
            },
        })
    }

    /// Text layer pass. External OCR data replaces the provider-native
    /// path outright; removing it falls back to the native path on the
    /// next render.
    async fn render_text_pass(
        &self,
        page: &dyn PageHandle,
        geom: &ResolvedGeometry,
        generation: Generation,
        counter: &GenerationCounter,
        blocks: Option<&[TextractBlock]>,
    ) -> Result<(), RenderFault> {
        if let Some(blocks) = blocks {
            let spans = {
                let mut fitter = self.fitter.borrow_mut();
                textract::build_text_overlay(
                    blocks,
                    self.props.borrow().page_number,
                    geom.effective_rotation,
                    geom.css_width,
                    geom.css_height,
                    &mut fitter,
                    &self.config.overlay_font_family,
                )
            };
            if !self.pass_current(generation, counter) {
                return Ok(());
            }
            self.surface.clear_text_layer();
            self.surface.apply_text_layer(spans);
            return Ok(());
        }

        let content = page.text_content().await?;
        if !self.pass_current(generation, counter) {
            return Ok(());
        }
        self.surface.clear_text_layer();
        self.backend
            .render_text_layer(TextLayerParams {
                surface: self.surface.as_ref(),
                content: &content,
                viewport: &geom.overlay_viewport,
            })
            .await?;
        Ok(())
    }

    /// Annotation pass, with the form overlay derived from the same
    /// fetched records.
    async fn render_annotation_pass(
        &self,
        page: &dyn PageHandle,
        geom: &ResolvedGeometry,
        generation: Generation,
        render_annotations: bool,
        render_forms: bool,
    ) -> Result<(), RenderFault> {
        let annotations = page.annotations(AnnotationIntent::Display).await?;
        if !self.pass_current(generation, &self.raster_generation) {
            return Ok(());
        }

        if render_annotations {
            self.surface.clear_annotation_layer();
            self.backend
                .render_annotation_layer(AnnotationLayerParams {
                    surface: self.surface.as_ref(),
                    page,
                    viewport: &geom.overlay_viewport,
                    annotations: &annotations,
                    links: &self.links,
                    image_resources_path: &self.config.image_resources_path,
                    render_forms: false,
                })
                .await?;
            if !self.pass_current(generation, &self.raster_generation) {
                return Ok(());
            }
        }

        if render_forms {
            let markers = forms::derive_form_overlay(&annotations, &geom.overlay_viewport);
            self.surface.clear_form_layer();
            self.surface.apply_form_layer(markers);
        }
        Ok(())
    }

    async fn cached_or_fetched_page(&self, number: u32) -> Result<Rc<dyn PageHandle>, RenderFault> {
        if let Some(page) = self.page.borrow().as_ref() {
            return Ok(Rc::clone(page));
        }
        let page = self.provider.page(number).await?;
        *self.page.borrow_mut() = Some(Rc::clone(&page));
        Ok(page)
    }

    fn fail(&self, page: u32, fault: RenderFault) -> RenderOutcome {
        if fault.is_cancellation() {
            // The replacement attempt owns the surface now.
            self.phase.set(RenderPhase::Superseded);
            return RenderOutcome::Superseded;
        }
        warn!("page {page}: render failed: {fault}");
        self.phase.set(RenderPhase::Failed);
        self.events.emit(ViewerEvent::RenderingFailed { page, fault });
        RenderOutcome::Failed
    }
}
