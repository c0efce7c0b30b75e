//! Crop-to-fill scaling
//!
//! Computes the normalized source rectangle that makes the video fill the
//! render control while keeping its aspect ratio. The excess on the longer
//! axis is cropped evenly from both edges so the image stays centered.

use crate::types::{BorderColor, NormalizedRect, PixelRect, Size};

/// Substituted for a zero scale factor
const MIN_SCALE_FACTOR: f64 = 0.0001;

/// Everything the engine needs to frame the video stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamGeometry {
    /// Source crop in fractions of the video
    pub source: NormalizedRect,
    /// Destination rectangle in control pixels
    pub destination: PixelRect,
    pub border: BorderColor,
}

/// Normalized crop for `video` shown in `control`.
///
/// Returns `None` unless both sizes are strictly positive.
pub fn crop_to_fill(control: Size, video: Size) -> Option<NormalizedRect> {
    if !control.is_positive() || !video.is_positive() {
        return None;
    }

    let (control_w, control_h) = (control.width as f64, control.height as f64);
    let (video_w, video_h) = (video.width as f64, video.height as f64);

    let video_aspect = video_w / video_h;
    let control_aspect = control_w / control_h;

    // Wider video fills the height; otherwise fill the width
    let mut scale = if video_aspect > control_aspect {
        control_h / video_h
    } else {
        control_w / video_w
    };
    if scale == 0.0 {
        scale = MIN_SCALE_FACTOR;
    }

    // Control footprint in video pixels
    let footprint_w = control_w / scale;
    let footprint_h = control_h / scale;

    let crop_x = (video_w - footprint_w).max(0.0);
    let crop_y = (video_h - footprint_h).max(0.0);

    let left = (crop_x / video_w / 2.0) as f32;
    let top = (crop_y / video_h / 2.0) as f32;

    Some(NormalizedRect {
        left,
        top,
        right: 1.0 - left,
        bottom: 1.0 - top,
    })
}

/// Crop plus destination rectangle for an engine stream update
pub fn stream_geometry(control: Size, video: Size, border: BorderColor) -> Option<StreamGeometry> {
    let source = crop_to_fill(control, video)?;
    Some(StreamGeometry {
        source,
        destination: PixelRect {
            left: 0,
            top: 0,
            right: control.width as i32,
            bottom: control.height as i32,
        },
        border,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_wide_video_crops_sides() {
        let rect = crop_to_fill(Size::new(640.0, 480.0), Size::new(1280.0, 720.0)).unwrap();
        assert!(approx(rect.left, 0.125), "left = {}", rect.left);
        assert!(approx(rect.right, 0.875), "right = {}", rect.right);
        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.bottom, 1.0);
    }

    #[test]
    fn test_tall_video_crops_top_and_bottom() {
        // 4:3 video in a 16:9 control: fill width, crop height
        let rect = crop_to_fill(Size::new(1280.0, 720.0), Size::new(640.0, 480.0)).unwrap();
        assert_eq!(rect.left, 0.0);
        assert_eq!(rect.right, 1.0);
        // footprint height = 720 / 2 = 360, crop = 120 of 480 -> 0.125 per edge
        assert!(approx(rect.top, 0.125), "top = {}", rect.top);
        assert!(approx(rect.bottom, 0.875));
    }

    #[test]
    fn test_matching_aspect_is_uncropped() {
        let rect = crop_to_fill(Size::new(960.0, 540.0), Size::new(1920.0, 1080.0)).unwrap();
        assert!(approx(rect.left, 0.0));
        assert!(approx(rect.top, 0.0));
        assert!(approx(rect.right, 1.0));
        assert!(approx(rect.bottom, 1.0));
    }

    #[test]
    fn test_non_positive_sizes_are_ignored() {
        let video = Size::new(1280.0, 720.0);
        assert!(crop_to_fill(Size::new(0.0, 480.0), video).is_none());
        assert!(crop_to_fill(Size::new(640.0, -1.0), video).is_none());
        assert!(crop_to_fill(Size::new(640.0, 480.0), Size::default()).is_none());
    }

    #[test]
    fn test_rect_is_symmetric() {
        let rect = crop_to_fill(Size::new(333.0, 777.0), Size::new(1920.0, 1080.0)).unwrap();
        assert!(approx(rect.left + rect.right, 1.0));
        assert!(approx(rect.top + rect.bottom, 1.0));
        assert!(rect.left >= 0.0 && rect.left < 0.5);
    }

    #[test]
    fn test_stream_geometry_destination() {
        let geometry = stream_geometry(
            Size::new(640.0, 480.0),
            Size::new(1280.0, 720.0),
            BorderColor::OPAQUE_BLACK,
        )
        .unwrap();
        assert_eq!(
            geometry.destination,
            PixelRect {
                left: 0,
                top: 0,
                right: 640,
                bottom: 480
            }
        );
        assert_eq!(geometry.border.a, 0xFF);
    }
}
