//! Form-field overlay derivation
//!
//! Widget annotations become non-interactive marker boxes layered over the
//! page, tagged with the field name and category so hosts can style or
//! inspect them. The overlay is rebuilt from scratch on every render pass.

use crate::geometry::Viewport;
use crate::provider::Annotation;

/// Annotation subtype carrying interactive form fields.
pub const WIDGET_SUBTYPE: &str = "Widget";

/// Category of a widget annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormFieldKind {
    Text,
    Checkbox,
    RadioButton,
    PushButton,
    ComboBox,
    ListBox,
    Signature,
    Unknown,
}

impl FormFieldKind {
    /// Display label, used verbatim as the marker's category attribute.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "Text Field",
            Self::Checkbox => "Checkbox",
            Self::RadioButton => "Radio Button",
            Self::PushButton => "Push Button",
            Self::ComboBox => "Combo Box",
            Self::ListBox => "List Box",
            Self::Signature => "Signature Field",
            Self::Unknown => "Unknown Field Type",
        }
    }

    /// Classify from the annotation's field type and boolean flags.
    #[must_use]
    pub fn classify(annotation: &Annotation) -> Self {
        match annotation.field_type.as_deref() {
            Some("Tx") => Self::Text,
            Some("Btn") if annotation.checkbox => Self::Checkbox,
            Some("Btn") if annotation.radio_button => Self::RadioButton,
            Some("Btn") => Self::PushButton,
            Some("Ch") if annotation.combo => Self::ComboBox,
            Some("Ch") => Self::ListBox,
            Some("Sig") => Self::Signature,
            _ => Self::Unknown,
        }
    }
}

/// One absolutely positioned, non-interactive marker in viewport pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FormFieldMarker {
    pub field_name: String,
    pub kind: FormFieldKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Derive the form overlay for one render pass from display annotations.
#[must_use]
pub fn derive_form_overlay(annotations: &[Annotation], viewport: &Viewport) -> Vec<FormFieldMarker> {
    annotations
        .iter()
        .filter(|a| a.subtype == WIDGET_SUBTYPE)
        .map(|annotation| {
            let [ax, ay, bx, by] = viewport.convert_rect(annotation.rect);
            let (x1, x2) = if ax <= bx { (ax, bx) } else { (bx, ax) };
            let (y1, y2) = if ay <= by { (ay, by) } else { (by, ay) };
            FormFieldMarker {
                field_name: annotation.field_name.clone().unwrap_or_default(),
                kind: FormFieldKind::classify(annotation),
                x: x1,
                y: viewport.height - y2,
                width: x2 - x1,
                height: y2 - y1,
            }
        })
        .collect()
}
