//! Synthetic selectable-text overlay built from external OCR output
//!
//! When a transcript is supplied the provider-native text layer is
//! bypassed entirely: each line-level block becomes one invisible,
//! absolutely positioned span aligned with the rendered page, so text
//! selection works over scanned content. Boxes arrive normalized to the
//! unrotated page and are remapped through the effective display rotation
//! before placement.

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use serde::Deserialize;

use crate::geometry::Rotation;

/// Font size at which the per-family reference sample is measured.
pub const REFERENCE_FONT_SIZE: f32 = 100.0;

/// Two-character sample whose rendered height anchors the fitting.
const REFERENCE_SAMPLE: &str = "Hg";

const MIN_X_SCALE: f32 = 0.1;
const MAX_X_SCALE: f32 = 10.0;

/// Block categories in the OCR transcript. Only `Line` blocks are placed.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub enum BlockType {
    #[serde(rename = "PAGE")]
    Page,
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "WORD")]
    Word,
    #[serde(other)]
    Other,
}

/// Normalized bounding box, all fields in [0, 1] relative to the
/// unrotated page.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct BoundingBox {
    #[serde(rename = "Left")]
    pub left: f32,
    #[serde(rename = "Top")]
    pub top: f32,
    #[serde(rename = "Width")]
    pub width: f32,
    #[serde(rename = "Height")]
    pub height: f32,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct BlockGeometry {
    #[serde(rename = "BoundingBox", default)]
    pub bounding_box: BoundingBox,
}

fn default_block_page() -> u32 {
    1
}

/// One OCR record as it appears on the wire.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TextractBlock {
    #[serde(rename = "BlockType")]
    pub block_type: BlockType,

    /// 1-indexed page number; single-page transcripts omit it.
    #[serde(rename = "Page", default = "default_block_page")]
    pub page: u32,

    #[serde(rename = "Text", default)]
    pub text: Option<String>,

    #[serde(rename = "Geometry", default)]
    pub geometry: BlockGeometry,
}

/// Top-level OCR payload.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TextractBundle {
    pub textract_blocks: Vec<TextractBlock>,
}

impl TextractBundle {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// One line of the synthetic overlay. Positions and sizes are percentages
/// of the page box; the adapter materializing these renders the glyphs
/// color-transparent so only the native raster shows through.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpanBox {
    pub left_pct: f32,
    pub top_pct: f32,
    pub width_pct: f32,
    pub height_pct: f32,
    pub font_size_px: f32,
    /// Horizontal-only glyph scale; vertical shape is never distorted.
    pub x_scale: f32,
    pub text: String,
}

/// Remap a normalized box from unrotated page space into the displayed
/// orientation.
#[must_use]
pub fn remap_box(b: BoundingBox, rotation: Rotation) -> BoundingBox {
    match rotation {
        Rotation::R0 => b,
        Rotation::R90 => BoundingBox {
            left: 1.0 - (b.top + b.height),
            top: b.left,
            width: b.height,
            height: b.width,
        },
        Rotation::R180 => BoundingBox {
            left: 1.0 - (b.left + b.width),
            top: 1.0 - (b.top + b.height),
            width: b.width,
            height: b.height,
        },
        Rotation::R270 => BoundingBox {
            left: b.top,
            top: 1.0 - (b.left + b.width),
            width: b.height,
            height: b.width,
        },
    }
}

/// Host text-measurement primitive backing the font fitting.
pub trait TextMeasurer {
    /// Rendered height in px of `sample` at `font_size` in `family`.
    fn sample_height(&self, family: &str, sample: &str, font_size: f32) -> Option<f32>;

    /// Rendered advance width in px of `text` at `font_size` in `family`.
    fn text_width(&self, family: &str, text: &str, font_size: f32) -> Option<f32>;
}

/// Fits font sizes and horizontal scales to OCR boxes, measuring each
/// font family's baseline height once and caching it.
pub struct FontFitter {
    measurer: Rc<dyn TextMeasurer>,
    baselines: LruCache<String, Option<f32>>,
}

impl FontFitter {
    #[must_use]
    pub fn new(measurer: Rc<dyn TextMeasurer>, cache_size: usize) -> Self {
        let capacity =
            NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero"));
        Self {
            measurer,
            baselines: LruCache::new(capacity),
        }
    }

    /// Height of the reference sample at [`REFERENCE_FONT_SIZE`], measured
    /// once per family. Unusable measurements are cached as absent so a
    /// broken family is not re-measured per block.
    fn baseline(&mut self, family: &str) -> Option<f32> {
        if let Some(cached) = self.baselines.get(family) {
            return *cached;
        }
        let measured = self
            .measurer
            .sample_height(family, REFERENCE_SAMPLE, REFERENCE_FONT_SIZE)
            .filter(|h| h.is_finite() && *h > 0.0);
        self.baselines.put(family.to_string(), measured);
        measured
    }

    /// Fitted font size for a block of `target_height_px`.
    pub fn fit_size(&mut self, family: &str, target_height_px: f32) -> f32 {
        match self.baseline(family) {
            Some(baseline) => REFERENCE_FONT_SIZE * target_height_px / baseline,
            None => target_height_px.max(1.0),
        }
    }

    /// Horizontal glyph scale stretching the measured line across
    /// `target_width_px`, clamped against degenerate OCR boxes.
    pub fn fit_x_scale(
        &self,
        family: &str,
        text: &str,
        font_size: f32,
        target_width_px: f32,
    ) -> f32 {
        let measured = self
            .measurer
            .text_width(family, text, font_size)
            .filter(|w| w.is_finite() && *w > 0.0);
        match measured {
            Some(width) => (target_width_px / width).clamp(MIN_X_SCALE, MAX_X_SCALE),
            None => 1.0,
        }
    }
}

/// Build the overlay for one page. Only line blocks whose `Page` matches
/// are placed, one span per line.
pub fn build_text_overlay(
    blocks: &[TextractBlock],
    page_number: u32,
    rotation: Rotation,
    css_width: f32,
    css_height: f32,
    fitter: &mut FontFitter,
    family: &str,
) -> Vec<TextSpanBox> {
    let mut spans = Vec::new();
    for block in blocks {
        if block.block_type != BlockType::Line || block.page != page_number {
            continue;
        }
        let Some(text) = block.text.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };

        let mapped = remap_box(block.geometry.bounding_box, rotation);
        let target_height = css_height * mapped.height;
        let target_width = css_width * mapped.width;
        let font_size = fitter.fit_size(family, target_height);
        let x_scale = fitter.fit_x_scale(family, text, font_size, target_width);

        spans.push(TextSpanBox {
            left_pct: mapped.left * 100.0,
            top_pct: mapped.top * 100.0,
            width_pct: mapped.width * 100.0,
            height_pct: mapped.height * 100.0,
            font_size_px: font_size,
            x_scale,
            text: text.to_string(),
        });
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    struct FixedMeasurer {
        height_per_100: Option<f32>,
        char_width_per_100: f32,
    }

    impl TextMeasurer for FixedMeasurer {
        fn sample_height(&self, _family: &str, _sample: &str, font_size: f32) -> Option<f32> {
            self.height_per_100.map(|h| h * font_size / 100.0)
        }

        fn text_width(&self, _family: &str, text: &str, font_size: f32) -> Option<f32> {
            Some(text.chars().count() as f32 * self.char_width_per_100 * font_size / 100.0)
        }
    }

    fn line_block(page: u32, text: &str, bbox: BoundingBox) -> TextractBlock {
        TextractBlock {
            block_type: BlockType::Line,
            page,
            text: Some(text.to_string()),
            geometry: BlockGeometry { bounding_box: bbox },
        }
    }

    fn sample_box() -> BoundingBox {
        BoundingBox {
            left: 0.1,
            top: 0.2,
            width: 0.5,
            height: 0.05,
        }
    }

    fn boxes_close(a: BoundingBox, b: BoundingBox) -> bool {
        (a.left - b.left).abs() < EPS
            && (a.top - b.top).abs() < EPS
            && (a.width - b.width).abs() < EPS
            && (a.height - b.height).abs() < EPS
    }

    #[test]
    fn remap_quarter_turn() {
        let mapped = remap_box(sample_box(), Rotation::R90);
        assert!(boxes_close(
            mapped,
            BoundingBox {
                left: 0.75,
                top: 0.1,
                width: 0.05,
                height: 0.5,
            }
        ));
    }

    #[test]
    fn remap_half_turn() {
        let mapped = remap_box(sample_box(), Rotation::R180);
        assert!(boxes_close(
            mapped,
            BoundingBox {
                left: 0.4,
                top: 0.75,
                width: 0.5,
                height: 0.05,
            }
        ));
    }

    #[test]
    fn four_quarter_turns_round_trip() {
        let mut b = sample_box();
        for _ in 0..4 {
            b = remap_box(b, Rotation::R90);
        }
        assert!(boxes_close(b, sample_box()));
    }

    #[test]
    fn fit_size_uses_baseline() {
        let measurer = Rc::new(FixedMeasurer {
            height_per_100: Some(120.0),
            char_width_per_100: 50.0,
        });
        let mut fitter = FontFitter::new(measurer, 8);
        // target 24px against a 120px baseline: 100 * 24 / 120
        assert!((fitter.fit_size("serif", 24.0) - 20.0).abs() < EPS);
    }

    #[test]
    fn fit_size_falls_back_without_metrics() {
        let measurer = Rc::new(FixedMeasurer {
            height_per_100: None,
            char_width_per_100: 50.0,
        });
        let mut fitter = FontFitter::new(measurer, 8);
        assert_eq!(fitter.fit_size("serif", 24.0), 24.0);
        assert_eq!(fitter.fit_size("serif", 0.25), 1.0);
    }

    #[test]
    fn x_scale_is_clamped() {
        let measurer = Rc::new(FixedMeasurer {
            height_per_100: Some(100.0),
            char_width_per_100: 50.0,
        });
        let fitter = FontFitter::new(measurer, 8);
        // 4 chars at size 100: 200px measured
        assert!((fitter.fit_x_scale("serif", "abcd", 100.0, 100.0) - 0.5).abs() < EPS);
        assert_eq!(fitter.fit_x_scale("serif", "abcd", 100.0, 1e6), MAX_X_SCALE);
        assert_eq!(fitter.fit_x_scale("serif", "abcd", 100.0, 0.0), MIN_X_SCALE);
    }

    #[test]
    fn overlay_places_only_matching_lines() {
        let measurer = Rc::new(FixedMeasurer {
            height_per_100: Some(100.0),
            char_width_per_100: 50.0,
        });
        let mut fitter = FontFitter::new(measurer, 8);
        let blocks = vec![
            line_block(1, "first line", sample_box()),
            line_block(2, "other page", sample_box()),
            TextractBlock {
                block_type: BlockType::Word,
                page: 1,
                text: Some("word".to_string()),
                geometry: BlockGeometry::default(),
            },
            TextractBlock {
                block_type: BlockType::Page,
                page: 1,
                text: None,
                geometry: BlockGeometry::default(),
            },
        ];

        let spans =
            build_text_overlay(&blocks, 1, Rotation::R0, 600.0, 800.0, &mut fitter, "sans-serif");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "first line");
        assert!((spans[0].left_pct - 10.0).abs() < 1e-3);
        assert!((spans[0].top_pct - 20.0).abs() < 1e-3);
        assert!((spans[0].width_pct - 50.0).abs() < 1e-3);
        assert!((spans[0].height_pct - 5.0).abs() < 1e-3);
        // target height 40px with a 1:1 baseline
        assert!((spans[0].font_size_px - 40.0).abs() < 1e-3);
    }

    #[test]
    fn bundle_parses_wire_format() {
        let raw = r#"{
            "textract_blocks": [
                {
                    "BlockType": "LINE",
                    "Page": 2,
                    "Text": "hello",
                    "Geometry": {
                        "BoundingBox": {"Left": 0.1, "Top": 0.2, "Width": 0.3, "Height": 0.04}
                    }
                },
                {"BlockType": "PAGE"}
            ]
        }"#;
        let bundle = TextractBundle::from_json(raw).unwrap();
        assert_eq!(bundle.textract_blocks.len(), 2);
        assert_eq!(bundle.textract_blocks[0].page, 2);
        assert_eq!(bundle.textract_blocks[0].text.as_deref(), Some("hello"));
        assert_eq!(bundle.textract_blocks[1].block_type, BlockType::Page);
        assert_eq!(bundle.textract_blocks[1].page, 1);
    }

    #[test]
    fn unknown_block_types_deserialize_as_other() {
        let raw = r#"{"BlockType": "KEY_VALUE_SET"}"#;
        let block: TextractBlock = serde_json::from_str(raw).unwrap();
        assert_eq!(block.block_type, BlockType::Other);
    }
}
