//! Viewer configuration
//!
//! Injected explicitly into every orchestrator instance. There is no
//! process-wide state: hosts that want render tracing or a different
//! overlay font pass a different config.

use serde::Deserialize;

fn default_device_pixel_ratio() -> f32 {
    1.0
}

fn default_overlay_font_family() -> String {
    "sans-serif".to_string()
}

fn default_font_cache_size() -> usize {
    32
}

#[derive(Clone, Debug, Deserialize)]
pub struct ViewerConfig {
    /// Device pixel ratio of the target display; multiplies the raster
    /// scale but never the CSS-space overlay scale.
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f32,

    /// Font family used for the synthetic OCR text overlay.
    #[serde(default = "default_overlay_font_family")]
    pub overlay_font_family: String,

    /// Capacity of the per-family baseline metrics cache.
    #[serde(default = "default_font_cache_size")]
    pub font_cache_size: usize,

    /// Base path for annotation icon resources, forwarded to the backend.
    #[serde(default)]
    pub image_resources_path: String,

    /// Emit debug-level tracing for every render pass.
    #[serde(default)]
    pub log_renders: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: default_device_pixel_ratio(),
            overlay_font_family: default_overlay_font_family(),
            font_cache_size: default_font_cache_size(),
            image_resources_path: String::new(),
            log_renders: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: ViewerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.device_pixel_ratio, 1.0);
        assert_eq!(config.overlay_font_family, "sans-serif");
        assert_eq!(config.font_cache_size, 32);
        assert!(!config.log_renders);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"device_pixel_ratio": 2.0, "log_renders": true}"#).unwrap();
        assert_eq!(config.device_pixel_ratio, 2.0);
        assert!(config.log_renders);
    }
}
