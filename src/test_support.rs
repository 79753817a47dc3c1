//! Test doubles for the external collaborators
//!
//! Scripted provider/backend/surface/measurer implementations shared by
//! the unit and integration tests (behind the `test-utils` feature).
//! Fetch and raster gates let tests control exactly when suspension
//! points resolve, which is how the superseding behavior is exercised.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;

use crate::backend::{AnnotationLayerParams, OverlayBackend, TextLayerParams};
use crate::error::RenderFault;
use crate::forms::FormFieldMarker;
use crate::geometry::{PageBox, Rotation, ScaleFactors};
use crate::provider::{
    Annotation, AnnotationIntent, DocumentProvider, PageHandle, RenderContext, RenderTask,
    TextContent,
};
use crate::surface::{PageSurface, RasterCanvas};
use crate::textract::{TextMeasurer, TextSpanBox};

/// Shared call counters across provider and backend doubles.
#[derive(Debug, Default)]
pub struct CallLog {
    pub page_fetches: Cell<usize>,
    pub raster_renders: Cell<usize>,
    pub raster_cancels: Cell<usize>,
    pub text_content_fetches: Cell<usize>,
    pub text_layer_renders: Cell<usize>,
    pub annotation_fetches: Cell<usize>,
    pub annotation_renders: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// Scripted document provider. Every page shares the same view box,
/// rotation, text and annotations; gates queue up against the next fetch
/// or raster in FIFO order.
pub struct ScriptedProvider {
    pub log: Rc<CallLog>,
    page_count: u32,
    view: PageBox,
    rotation: Rotation,
    text: TextContent,
    annotations: Vec<Annotation>,
    fetch_gates: Rc<RefCell<VecDeque<oneshot::Receiver<()>>>>,
    raster_gates: Rc<RefCell<VecDeque<oneshot::Receiver<Result<(), RenderFault>>>>>,
    closed: Cell<bool>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(page_count: u32, view: PageBox) -> Self {
        Self {
            log: Rc::new(CallLog::default()),
            page_count,
            view,
            rotation: Rotation::R0,
            text: TextContent::from_lines(["native text"]),
            annotations: vec![],
            fetch_gates: Rc::new(RefCell::new(VecDeque::new())),
            raster_gates: Rc::new(RefCell::new(VecDeque::new())),
            closed: Cell::new(false),
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: TextContent) -> Self {
        self.text = text;
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Queue a gate the next page fetch must wait on.
    pub fn gate_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.fetch_gates.borrow_mut().push_back(rx);
        tx
    }

    /// Queue a gate the next raster render resolves through.
    pub fn gate_next_raster(&self) -> oneshot::Sender<Result<(), RenderFault>> {
        let (tx, rx) = oneshot::channel();
        self.raster_gates.borrow_mut().push_back(rx);
        tx
    }

    /// All later fetches reject as if the document were destroyed.
    pub fn close(&self) {
        self.closed.set(true);
    }
}

#[async_trait(?Send)]
impl DocumentProvider for ScriptedProvider {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn page(&self, number: u32) -> Result<Rc<dyn PageHandle>, RenderFault> {
        bump(&self.log.page_fetches);
        if self.closed.get() {
            return Err(RenderFault::DocumentClosed);
        }
        if number < 1 || number > self.page_count {
            return Err(RenderFault::PageOutOfRange {
                page: number,
                count: self.page_count,
            });
        }
        let gate = self.fetch_gates.borrow_mut().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(Rc::new(ScriptedPage {
            view: self.view,
            rotation: self.rotation,
            text: self.text.clone(),
            annotations: self.annotations.clone(),
            log: Rc::clone(&self.log),
            raster_gates: Rc::clone(&self.raster_gates),
        }))
    }
}

struct ScriptedPage {
    view: PageBox,
    rotation: Rotation,
    text: TextContent,
    annotations: Vec<Annotation>,
    log: Rc<CallLog>,
    raster_gates: Rc<RefCell<VecDeque<oneshot::Receiver<Result<(), RenderFault>>>>>,
}

#[async_trait(?Send)]
impl PageHandle for ScriptedPage {
    fn view(&self) -> PageBox {
        self.view
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    async fn text_content(&self) -> Result<TextContent, RenderFault> {
        bump(&self.log.text_content_fetches);
        Ok(self.text.clone())
    }

    async fn annotations(&self, _intent: AnnotationIntent) -> Result<Vec<Annotation>, RenderFault> {
        bump(&self.log.annotation_fetches);
        Ok(self.annotations.clone())
    }

    fn render(&self, _ctx: RenderContext) -> Box<dyn RenderTask> {
        bump(&self.log.raster_renders);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        Box::new(ScriptedRasterTask {
            gate: self.raster_gates.borrow_mut().pop_front(),
            cancel_tx: Some(cancel_tx),
            cancel_rx: Some(cancel_rx),
            log: Rc::clone(&self.log),
        })
    }
}

/// Raster task double: resolves immediately unless gated, and rejects
/// with the cancellation signal once cancelled.
pub struct ScriptedRasterTask {
    gate: Option<oneshot::Receiver<Result<(), RenderFault>>>,
    cancel_tx: Option<oneshot::Sender<()>>,
    cancel_rx: Option<oneshot::Receiver<()>>,
    log: Rc<CallLog>,
}

impl RenderTask for ScriptedRasterTask {
    fn completion(&mut self) -> LocalBoxFuture<'static, Result<(), RenderFault>> {
        let gate = self.gate.take();
        let cancel = self.cancel_rx.take();
        async move {
            match (gate, cancel) {
                (None, Some(mut cancel)) => match cancel.try_recv() {
                    Ok(Some(())) => Err(RenderFault::Cancelled),
                    _ => Ok(()),
                },
                (None, None) => Ok(()),
                (Some(gate), Some(cancel)) => {
                    let mut gate = gate.fuse();
                    let mut cancel = cancel.fuse();
                    futures::select! {
                        _ = cancel => Err(RenderFault::Cancelled),
                        result = gate => result.unwrap_or(Err(RenderFault::Cancelled)),
                    }
                }
                (Some(gate), None) => gate.await.unwrap_or(Err(RenderFault::Cancelled)),
            }
        }
        .boxed_local()
    }

    fn cancel(&mut self) {
        bump(&self.log.raster_cancels);
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Canvas double tracking sizes and clears.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub size: Cell<(u32, u32)>,
    pub clear_calls: Cell<usize>,
    pub zero_sizes: Cell<usize>,
}

impl RasterCanvas for RecordingCanvas {
    fn set_pixel_size(&self, width: u32, height: u32) {
        if width == 0 && height == 0 {
            bump(&self.zero_sizes);
        }
        self.size.set((width, height));
    }

    fn pixel_size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn clear(&self) {
        bump(&self.clear_calls);
    }
}

/// Surface double recording everything the orchestrator applies.
#[derive(Default)]
pub struct RecordingSurface {
    pub canvas: Rc<RecordingCanvas>,
    pub canvas_missing: Cell<bool>,
    pub css_size: Cell<(f32, f32)>,
    pub scale_factors: Cell<Option<ScaleFactors>>,
    pub text_spans: RefCell<Vec<TextSpanBox>>,
    pub text_clears: Cell<usize>,
    pub form_fields: RefCell<Vec<FormFieldMarker>>,
    pub form_clears: Cell<usize>,
    pub annotation_clears: Cell<usize>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl PageSurface for RecordingSurface {
    fn canvas(&self) -> Option<Rc<dyn RasterCanvas>> {
        if self.canvas_missing.get() {
            None
        } else {
            Some(Rc::clone(&self.canvas) as Rc<dyn RasterCanvas>)
        }
    }

    fn set_css_size(&self, width: f32, height: f32) {
        self.css_size.set((width, height));
    }

    fn set_scale_factors(&self, factors: ScaleFactors) {
        self.scale_factors.set(Some(factors));
    }

    fn apply_text_layer(&self, spans: Vec<TextSpanBox>) {
        *self.text_spans.borrow_mut() = spans;
    }

    fn clear_text_layer(&self) {
        bump(&self.text_clears);
        self.text_spans.borrow_mut().clear();
    }

    fn apply_form_layer(&self, fields: Vec<FormFieldMarker>) {
        *self.form_fields.borrow_mut() = fields;
    }

    fn clear_form_layer(&self) {
        bump(&self.form_clears);
        self.form_fields.borrow_mut().clear();
    }

    fn clear_annotation_layer(&self) {
        bump(&self.annotation_clears);
    }
}

/// Backend double recording rendered text content and annotation batches.
pub struct RecordingBackend {
    pub log: Rc<CallLog>,
    pub text_runs: RefCell<Vec<String>>,
    pub annotation_batches: RefCell<Vec<usize>>,
    pub fail_text_layer: Cell<bool>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new(log: Rc<CallLog>) -> Self {
        Self {
            log,
            text_runs: RefCell::new(vec![]),
            annotation_batches: RefCell::new(vec![]),
            fail_text_layer: Cell::new(false),
        }
    }
}

#[async_trait(?Send)]
impl OverlayBackend for RecordingBackend {
    async fn render_text_layer(&self, params: TextLayerParams<'_>) -> Result<(), RenderFault> {
        bump(&self.log.text_layer_renders);
        if self.fail_text_layer.get() {
            return Err(RenderFault::backend("text layer failed"));
        }
        let joined = params
            .content
            .items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.text_runs.borrow_mut().push(joined);
        Ok(())
    }

    async fn render_annotation_layer(
        &self,
        params: AnnotationLayerParams<'_>,
    ) -> Result<(), RenderFault> {
        bump(&self.log.annotation_renders);
        self.annotation_batches
            .borrow_mut()
            .push(params.annotations.len());
        Ok(())
    }
}

/// Deterministic linear text metrics: heights and widths scale with the
/// font size, widths additionally with character count.
pub struct LinearMeasurer {
    pub baseline_per_100: Option<f32>,
    pub char_width_per_100: f32,
}

impl Default for LinearMeasurer {
    fn default() -> Self {
        Self {
            baseline_per_100: Some(100.0),
            char_width_per_100: 50.0,
        }
    }
}

impl TextMeasurer for LinearMeasurer {
    fn sample_height(&self, _family: &str, _sample: &str, font_size: f32) -> Option<f32> {
        self.baseline_per_100.map(|h| h * font_size / 100.0)
    }

    fn text_width(&self, _family: &str, text: &str, font_size: f32) -> Option<f32> {
        Some(text.chars().count() as f32 * self.char_width_per_100 * font_size / 100.0)
    }
}
