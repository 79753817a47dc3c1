//! Page geometry resolution
//!
//! Pure math for turning container constraints, rotation and scale into
//! concrete CSS and device pixel dimensions. Nothing in here touches a
//! surface or a provider, so every function is directly unit-testable.

/// Minimum allowed user scale factor
pub const MIN_SCALE: f32 = 0.1;

/// Quarter-turn display rotation.
///
/// All rotation inputs (requested and intrinsic) are reduced to one of the
/// four quarter turns before any geometry is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Reduce an arbitrary degree value to a quarter turn.
    /// Negative values wrap; non-multiples of 90 truncate downward.
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) / 90 {
            0 => Self::R0,
            1 => Self::R90,
            2 => Self::R180,
            _ => Self::R270,
        }
    }

    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// True when width and height swap roles (odd quarter turn).
    #[must_use]
    pub const fn transposed(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }
}

impl std::ops::Add for Rotation {
    type Output = Rotation;

    fn add(self, other: Rotation) -> Rotation {
        Rotation::from_degrees(self.degrees() + other.degrees())
    }
}

/// Intrinsic page bounding box in page units, [x0, y0, x1, y1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn from_array(view: [f32; 4]) -> Self {
        Self::new(view[0], view[1], view[2], view[3])
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Aspect ratio used for CSS sizing: height/width of the page as displayed,
/// i.e. the reciprocal of the unrotated ratio when the rotation transposes.
/// Returns 0.0 for degenerate boxes; callers treat that as unmeasurable.
#[must_use]
pub fn aspect_ratio(view: PageBox, effective: Rotation) -> f32 {
    let (w, h) = (view.width(), view.height());
    if w <= 0.0 || h <= 0.0 {
        return 0.0;
    }
    if effective.transposed() { w / h } else { h / w }
}

/// Resolve the CSS dimensions of a page from container constraints.
///
/// Resolution order:
/// 1. explicit height without width: height wins, width = height / ratio
/// 2. explicit width: capped by the container when one is measured
/// 3. container width alone
///
/// Returns (0.0, 0.0) when no usable width or ratio exists. Callers must
/// treat a zero result as "not yet measurable" and retry on the next
/// opportunity, never as a finished layout.
#[must_use]
pub fn dimensions(
    ratio: f32,
    container_width: f32,
    requested_width: Option<f32>,
    requested_height: Option<f32>,
) -> (f32, f32) {
    if !ratio.is_finite() || ratio <= 0.0 {
        return (0.0, 0.0);
    }

    if let (None, Some(height)) = (requested_width, requested_height) {
        if !height.is_finite() || height <= 0.0 {
            return (0.0, 0.0);
        }
        return (height / ratio, height);
    }

    let width = match requested_width {
        Some(width) if container_width > 0.0 => width.min(container_width),
        Some(width) => width,
        None if container_width > 0.0 => container_width,
        None => return (0.0, 0.0),
    };

    if !width.is_finite() || width <= 0.0 {
        return (0.0, 0.0);
    }
    (width, width * ratio)
}

/// Pixel scale mapping intrinsic page units onto the resolved CSS width.
#[must_use]
pub fn page_scale(css_width: f32, view: PageBox, effective: Rotation) -> f32 {
    let intrinsic = if effective.transposed() {
        view.height()
    } else {
        view.width()
    };
    if intrinsic <= 0.0 {
        return 0.0;
    }
    css_width / intrinsic
}

/// Clamp a user scale to a sane range, mapping NaN/Inf to 1.0.
#[must_use]
pub fn clamp_scale(scale: f32) -> f32 {
    if !scale.is_finite() {
        1.0
    } else {
        scale.max(MIN_SCALE)
    }
}

/// Scale metadata exported to the host surface after a successful render,
/// typically surfaced as CSS custom properties.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    /// CSS width divided by intrinsic page width (the fit factor).
    pub scale_factor: f32,
    /// Page user unit as supplied by the provider.
    pub user_unit: f32,
    /// Scale of the base (user-scale) viewport.
    pub total_scale_factor: f32,
}

/// Resolved scale/rotation/size description driving one render or overlay
/// pass. Immutable: any scale or rotation change produces a new instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub view: PageBox,
    pub scale: f32,
    pub rotation: Rotation,
    pub user_unit: f32,
    pub width: f32,
    pub height: f32,
    /// Page-space to viewport-space affine transform [a, b, c, d, e, f].
    pub transform: [f32; 6],
    dont_flip: bool,
}

impl Viewport {
    #[must_use]
    pub fn new(view: PageBox, scale: f32, rotation: Rotation, user_unit: f32, dont_flip: bool) -> Self {
        let center_x = (view.x0 + view.x1) / 2.0;
        let center_y = (view.y0 + view.y1) / 2.0;

        let (rot_a, rot_b, mut rot_c, mut rot_d): (f32, f32, f32, f32) = match rotation {
            Rotation::R0 => (1.0, 0.0, 0.0, -1.0),
            Rotation::R90 => (0.0, 1.0, 1.0, 0.0),
            Rotation::R180 => (-1.0, 0.0, 0.0, 1.0),
            Rotation::R270 => (0.0, -1.0, -1.0, 0.0),
        };
        if dont_flip {
            rot_c = -rot_c;
            rot_d = -rot_d;
        }

        let (offset_x, offset_y, width, height) = if rot_a == 0.0 {
            (
                (center_y - view.y0).abs() * scale,
                (center_x - view.x0).abs() * scale,
                view.height() * scale,
                view.width() * scale,
            )
        } else {
            (
                (center_x - view.x0).abs() * scale,
                (center_y - view.y0).abs() * scale,
                view.width() * scale,
                view.height() * scale,
            )
        };

        let transform = [
            rot_a * scale,
            rot_b * scale,
            rot_c * scale,
            rot_d * scale,
            offset_x - rot_a * scale * center_x - rot_c * scale * center_y,
            offset_y - rot_b * scale * center_x - rot_d * scale * center_y,
        ];

        Self {
            view,
            scale,
            rotation,
            user_unit,
            width,
            height,
            transform,
            dont_flip,
        }
    }

    /// New viewport at a different absolute scale (device-pixel-ratio
    /// adjustment and the like), other inputs unchanged.
    #[must_use]
    pub fn rescaled(&self, scale: f32) -> Self {
        Self::new(self.view, scale, self.rotation, self.user_unit, self.dont_flip)
    }

    #[must_use]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        Self::new(self.view, self.scale, rotation, self.user_unit, self.dont_flip)
    }

    /// Overlay-space variant: same geometry, transform left unflipped so
    /// top-origin layer coordinates line up with the displayed page.
    #[must_use]
    pub fn unflipped(&self) -> Self {
        Self::new(self.view, self.scale, self.rotation, self.user_unit, true)
    }

    #[must_use]
    pub fn convert_point(&self, x: f32, y: f32) -> (f32, f32) {
        let t = &self.transform;
        (t[0] * x + t[2] * y + t[4], t[1] * x + t[3] * y + t[5])
    }

    /// Map a page-space rectangle [x1, y1, x2, y2] into viewport pixels.
    /// The result keeps corner order; callers normalize min/max as needed.
    #[must_use]
    pub fn convert_rect(&self, rect: [f32; 4]) -> [f32; 4] {
        let (ax, ay) = self.convert_point(rect[0], rect[1]);
        let (bx, by) = self.convert_point(rect[2], rect[3]);
        [ax, ay, bx, by]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn letter() -> PageBox {
        PageBox::new(0.0, 0.0, 600.0, 800.0)
    }

    #[test]
    fn rotation_normalizes_degrees() {
        assert_eq!(Rotation::from_degrees(0), Rotation::R0);
        assert_eq!(Rotation::from_degrees(90), Rotation::R90);
        assert_eq!(Rotation::from_degrees(360), Rotation::R0);
        assert_eq!(Rotation::from_degrees(450), Rotation::R90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::R270);
    }

    #[test]
    fn rotation_combines_with_intrinsic() {
        assert_eq!(Rotation::R90 + Rotation::R270, Rotation::R0);
        assert_eq!(Rotation::R180 + Rotation::R270, Rotation::R90);
        assert!((Rotation::R90 + Rotation::R0).transposed());
        assert!(!(Rotation::R90 + Rotation::R90).transposed());
    }

    #[test]
    fn aspect_ratio_transposes() {
        let view = letter();
        assert!((aspect_ratio(view, Rotation::R0) - 800.0 / 600.0).abs() < EPS);
        assert!((aspect_ratio(view, Rotation::R90) - 600.0 / 800.0).abs() < EPS);
        assert_eq!(aspect_ratio(PageBox::new(0.0, 0.0, 0.0, 800.0), Rotation::R0), 0.0);
    }

    #[test]
    fn dimensions_height_driven() {
        let (w, h) = dimensions(2.0, 500.0, None, Some(400.0));
        assert!((w - 200.0).abs() < EPS);
        assert!((h - 400.0).abs() < EPS);
    }

    #[test]
    fn dimensions_width_capped_by_container() {
        let (w, h) = dimensions(1.5, 300.0, Some(500.0), None);
        assert!((w - 300.0).abs() < EPS);
        assert!((h - 450.0).abs() < EPS);
    }

    #[test]
    fn dimensions_explicit_width_without_container() {
        let (w, h) = dimensions(1.5, 0.0, Some(500.0), None);
        assert!((w - 500.0).abs() < EPS);
        assert!((h - 750.0).abs() < EPS);
    }

    #[test]
    fn dimensions_container_only() {
        let (w, h) = dimensions(0.5, 640.0, None, None);
        assert!((w - 640.0).abs() < EPS);
        assert!((h - 320.0).abs() < EPS);
    }

    #[test]
    fn dimensions_zero_when_unmeasurable() {
        assert_eq!(dimensions(1.5, 0.0, None, None), (0.0, 0.0));
        assert_eq!(dimensions(0.0, 640.0, None, None), (0.0, 0.0));
        assert_eq!(dimensions(f32::NAN, 640.0, None, None), (0.0, 0.0));
        assert_eq!(dimensions(1.5, -10.0, None, None), (0.0, 0.0));
    }

    #[test]
    fn dimensions_width_times_ratio_is_height() {
        for &(ratio, container, req_w) in &[
            (1.5_f32, 320.0_f32, None::<f32>),
            (0.75, 1024.0, Some(600.0)),
            (2.0, 0.0, Some(128.0)),
        ] {
            let (w, h) = dimensions(ratio, container, req_w, None);
            assert!((w * ratio - h).abs() < EPS, "ratio {ratio}");
        }
    }

    #[test]
    fn page_scale_matches_fit() {
        assert!((page_scale(300.0, letter(), Rotation::R0) - 0.5).abs() < EPS);
        assert!((page_scale(400.0, letter(), Rotation::R90) - 0.5).abs() < EPS);
        assert_eq!(page_scale(300.0, PageBox::default(), Rotation::R0), 0.0);
    }

    #[test]
    fn clamp_scale_handles_degenerate_input() {
        assert_eq!(clamp_scale(f32::NAN), 1.0);
        assert_eq!(clamp_scale(f32::INFINITY), 1.0);
        assert_eq!(clamp_scale(0.0), MIN_SCALE);
        assert_eq!(clamp_scale(2.5), 2.5);
    }

    #[test]
    fn viewport_dimensions_follow_rotation() {
        let vp = Viewport::new(letter(), 1.0, Rotation::R0, 1.0, false);
        assert!((vp.width - 600.0).abs() < EPS);
        assert!((vp.height - 800.0).abs() < EPS);

        let turned = vp.rotated(Rotation::R90);
        assert!((turned.width - 800.0).abs() < EPS);
        assert!((turned.height - 600.0).abs() < EPS);
    }

    #[test]
    fn viewport_flips_page_space_y() {
        let vp = Viewport::new(letter(), 1.0, Rotation::R0, 1.0, false);
        let (x, y) = vp.convert_point(0.0, 0.0);
        assert!((x - 0.0).abs() < EPS);
        assert!((y - 800.0).abs() < EPS);

        let (x, y) = vp.convert_point(0.0, 800.0);
        assert!(x.abs() < EPS && y.abs() < EPS);
    }

    #[test]
    fn unflipped_viewport_is_identity_at_r0() {
        let vp = Viewport::new(letter(), 1.0, Rotation::R0, 1.0, false).unflipped();
        let (x, y) = vp.convert_point(100.0, 200.0);
        assert!((x - 100.0).abs() < EPS);
        assert!((y - 200.0).abs() < EPS);
    }

    #[test]
    fn rescale_preserves_transform_shape() {
        let vp = Viewport::new(letter(), 1.0, Rotation::R0, 1.0, false);
        let dev = vp.rescaled(2.0);
        assert!((dev.width - 1200.0).abs() < EPS);
        assert!((dev.height - 1600.0).abs() < EPS);
        let (x, y) = dev.convert_point(0.0, 800.0);
        assert!(x.abs() < EPS && y.abs() < EPS);
    }

    #[test]
    fn convert_rect_spans_corners() {
        let vp = Viewport::new(letter(), 1.0, Rotation::R0, 1.0, false);
        let [x1, y1, x2, y2] = vp.convert_rect([100.0, 100.0, 200.0, 300.0]);
        assert!((x1 - 100.0).abs() < EPS);
        assert!((y1 - 700.0).abs() < EPS);
        assert!((x2 - 200.0).abs() < EPS);
        assert!((y2 - 500.0).abs() < EPS);
    }
}
