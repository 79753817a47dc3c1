//! Page-description provider contract
//!
//! The engine never parses documents itself. A provider hands out page
//! handles carrying geometry metadata plus the async operations one render
//! cycle needs: text content, annotations and a cancellable raster task.
//! Everything runs on one logical thread, so handles are `Rc` and the
//! futures are not `Send`.

use std::rc::Rc;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;

use crate::error::RenderFault;
use crate::geometry::{PageBox, Rotation, Viewport};
use crate::surface::RasterCanvas;

/// Rendering intent for annotation fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnotationIntent {
    Display,
    Print,
}

/// One run of text from the provider's native text content.
#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub text: String,
}

/// Native text content of a page, consumed opaquely by the backend's
/// text-layer renderer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

impl TextContent {
    #[must_use]
    pub fn from_lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            items: lines
                .into_iter()
                .map(|text| TextItem { text: text.into() })
                .collect(),
        }
    }
}

/// Navigation target attached to a link annotation.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkTarget {
    Internal { page: u32 },
    External { uri: String },
}

/// One annotation record with the fields the overlay passes consume.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotation {
    pub id: String,
    /// Annotation subtype, e.g. "Widget" or "Link".
    pub subtype: String,
    /// Native rectangle [x1, y1, x2, y2] in page units.
    pub rect: [f32; 4],
    /// Form field type, e.g. "Tx", "Btn", "Ch", "Sig".
    pub field_type: Option<String>,
    pub field_name: Option<String>,
    pub checkbox: bool,
    pub radio_button: bool,
    pub combo: bool,
    pub link: Option<LinkTarget>,
}

/// Everything the raster pass hands to the provider's renderer.
pub struct RenderContext {
    pub canvas: Rc<dyn RasterCanvas>,
    pub viewport: Viewport,
}

/// In-flight raster render.
///
/// The completion future is taken exactly once; the task object stays
/// behind so a replacement attempt can cancel it. After `cancel` the
/// future resolves with [`RenderFault::Cancelled`].
pub trait RenderTask {
    fn completion(&mut self) -> LocalBoxFuture<'static, Result<(), RenderFault>>;

    /// Cooperatively cancel the pass. Idempotent.
    fn cancel(&mut self);
}

/// Provider-side reference to one page.
#[async_trait(?Send)]
pub trait PageHandle {
    /// Intrinsic bounding box in page units.
    fn view(&self) -> PageBox;

    /// Intrinsic rotation from document metadata.
    fn rotation(&self) -> Rotation;

    fn user_unit(&self) -> f32 {
        1.0
    }

    /// Geometry-adjusted viewport. `rotation` is the requested display
    /// rotation; the page's intrinsic rotation is folded in.
    fn viewport(&self, scale: f32, rotation: Rotation) -> Viewport {
        Viewport::new(
            self.view(),
            scale,
            rotation + self.rotation(),
            self.user_unit(),
            false,
        )
    }

    async fn text_content(&self) -> Result<TextContent, RenderFault>;

    async fn annotations(&self, intent: AnnotationIntent) -> Result<Vec<Annotation>, RenderFault>;

    /// Start a raster render into the context's canvas.
    fn render(&self, ctx: RenderContext) -> Box<dyn RenderTask>;
}

/// The document itself, as far as the engine is concerned.
#[async_trait(?Send)]
pub trait DocumentProvider {
    fn page_count(&self) -> u32;

    /// Fetch a page handle (1-indexed). Rejects out-of-range numbers and
    /// every call made after the document was closed.
    async fn page(&self, number: u32) -> Result<Rc<dyn PageHandle>, RenderFault>;
}
