//! Host surface seam
//!
//! The engine builds immutable overlay descriptor lists and hands them to
//! these adapter traits; a thin host layer materializes them into its
//! widget tree. Handles use interior mutability behind `&self` since all
//! mutation happens on the single UI thread.

use std::rc::Rc;

use crate::forms::FormFieldMarker;
use crate::geometry::ScaleFactors;
use crate::textract::TextSpanBox;

/// Raster target backing one page.
pub trait RasterCanvas {
    /// Resize the backing store. Setting (0, 0) releases the pixel memory.
    fn set_pixel_size(&self, width: u32, height: u32);

    fn pixel_size(&self) -> (u32, u32);

    /// Clear all pixels without resizing.
    fn clear(&self);
}

/// Per-page element tree owned by the host.
///
/// Exactly one orchestrator instance owns a surface at any time; the
/// orchestrator only mutates it between suspension points, after its
/// generation check passed.
pub trait PageSurface {
    /// Canvas for the raster pass. `None` means the element tree is not
    /// currently in a renderable state and the attempt aborts silently.
    fn canvas(&self) -> Option<Rc<dyn RasterCanvas>>;

    /// CSS size applied to the page element and every overlay layer.
    fn set_css_size(&self, width: f32, height: f32);

    /// Export scale metadata, typically as CSS custom properties.
    fn set_scale_factors(&self, factors: ScaleFactors);

    fn apply_text_layer(&self, spans: Vec<TextSpanBox>);

    fn clear_text_layer(&self);

    fn apply_form_layer(&self, fields: Vec<FormFieldMarker>);

    fn clear_form_layer(&self);

    /// Empty the container the backend's annotation renderer draws into.
    fn clear_annotation_layer(&self);
}
