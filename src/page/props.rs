//! Reactive prop surface for one page
//!
//! Prop changes are classified by a pure diff into the render work they
//! imply, mirroring how layout commands fold into effects elsewhere in
//! the engine.

use crate::textract::TextractBlock;

/// Host-supplied props for one page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageProps {
    /// 1-indexed page number.
    pub page_number: u32,
    /// User scale factor, sanitized before use.
    pub scale: f32,
    /// Requested display rotation in degrees.
    pub rotation: i32,
    pub text_layer: bool,
    pub annotation_layer: bool,
    pub form_layer: bool,
    /// Explicit CSS width; capped by the container when one is measured.
    pub width: Option<f32>,
    /// Explicit CSS height; wins when no width is given.
    pub height: Option<f32>,
    /// External OCR transcript. When present the native text layer is
    /// bypassed entirely.
    pub textract_blocks: Option<Vec<TextractBlock>>,
}

impl Default for PageProps {
    fn default() -> Self {
        Self {
            page_number: 1,
            scale: 1.0,
            rotation: 0,
            text_layer: false,
            annotation_layer: false,
            form_layer: false,
            width: None,
            height: None,
            textract_blocks: None,
        }
    }
}

impl PageProps {
    /// True when layout is height-driven and container width changes are
    /// not an input.
    #[must_use]
    pub fn height_driven(&self) -> bool {
        self.height.is_some() && self.width.is_none()
    }
}

/// Work implied by replacing one set of props with another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropsAction {
    /// Nothing render-relevant changed.
    None,
    /// Geometry or layer composition changed: full cleanup + render.
    Rerender,
    /// Only text-layer inputs changed: redraw that layer under its own
    /// generation, leaving raster and annotations untouched.
    TextLayerOnly,
}

/// Classify a prop replacement.
#[must_use]
pub fn diff_props(old: &PageProps, new: &PageProps) -> PropsAction {
    if old.page_number != new.page_number
        || old.rotation != new.rotation
        || (old.scale - new.scale).abs() > f32::EPSILON
        || old.width != new.width
        || old.height != new.height
        || old.annotation_layer != new.annotation_layer
        || old.form_layer != new.form_layer
    {
        return PropsAction::Rerender;
    }
    if old.text_layer != new.text_layer || old.textract_blocks != new.textract_blocks {
        return PropsAction::TextLayerOnly;
    }
    PropsAction::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_props_need_nothing() {
        let props = PageProps::default();
        assert_eq!(diff_props(&props, &props.clone()), PropsAction::None);
    }

    #[test]
    fn geometry_changes_rerender() {
        let old = PageProps::default();

        let mut new = old.clone();
        new.scale = 2.0;
        assert_eq!(diff_props(&old, &new), PropsAction::Rerender);

        let mut new = old.clone();
        new.rotation = 90;
        assert_eq!(diff_props(&old, &new), PropsAction::Rerender);

        let mut new = old.clone();
        new.width = Some(300.0);
        assert_eq!(diff_props(&old, &new), PropsAction::Rerender);

        let mut new = old.clone();
        new.height = Some(500.0);
        assert_eq!(diff_props(&old, &new), PropsAction::Rerender);
    }

    #[test]
    fn text_layer_toggle_is_narrow() {
        let old = PageProps::default();
        let mut new = old.clone();
        new.text_layer = true;
        assert_eq!(diff_props(&old, &new), PropsAction::TextLayerOnly);
    }

    #[test]
    fn textract_change_is_narrow() {
        let mut old = PageProps::default();
        old.text_layer = true;
        let mut new = old.clone();
        new.textract_blocks = Some(vec![]);
        assert_eq!(diff_props(&old, &new), PropsAction::TextLayerOnly);
    }

    #[test]
    fn geometry_beats_text_layer() {
        let old = PageProps::default();
        let mut new = old.clone();
        new.text_layer = true;
        new.scale = 1.5;
        assert_eq!(diff_props(&old, &new), PropsAction::Rerender);
    }

    #[test]
    fn height_driven_detection() {
        let mut props = PageProps::default();
        assert!(!props.height_driven());
        props.height = Some(400.0);
        assert!(props.height_driven());
        props.width = Some(300.0);
        assert!(!props.height_driven());
    }
}
