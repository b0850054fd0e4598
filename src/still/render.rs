use crate::error::CaptureError;
use crate::platform::Artifact;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, Rgb, RgbImage, Rgba, RgbaImage};

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Where an image lands when fitted into a canvas without distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fit `image` inside `canvas`, preserving aspect ratio and centering.
pub fn letterbox(canvas: (u32, u32), image: (u32, u32)) -> Placement {
    let (cw, ch) = (canvas.0 as f64, canvas.1 as f64);
    let (iw, ih) = (image.0 as f64, image.1 as f64);

    let scale = (cw / iw).min(ch / ih);
    let width = iw * scale;
    let height = ih * scale;

    Placement {
        scale,
        x: (cw - width) / 2.0,
        y: (ch - height) / 2.0,
        width,
        height,
    }
}

/// Render `image` letterboxed onto a black canvas of `canvas_size`.
pub fn draw_letterboxed(canvas_size: (u32, u32), image: &RgbaImage) -> RgbaImage {
    let (cw, ch) = canvas_size;
    let mut canvas = RgbaImage::from_pixel(cw, ch, Rgba([0, 0, 0, 255]));

    if image.width() == 0 || image.height() == 0 || cw == 0 || ch == 0 {
        return canvas;
    }

    let placement = letterbox(canvas_size, image.dimensions());
    let width = (placement.width.round() as u32).clamp(1, cw);
    let height = (placement.height.round() as u32).clamp(1, ch);

    let scaled = if (width, height) == image.dimensions() {
        image.clone()
    } else {
        imageops::resize(image, width, height, FilterType::Triangle)
    };

    imageops::overlay(
        &mut canvas,
        &scaled,
        placement.x.round() as i64,
        placement.y.round() as i64,
    );
    canvas
}

/// Encode a bitmap as JPEG over a black background.
pub fn bitmap_to_jpeg(image: &RgbaImage, quality: u8) -> Result<Artifact, CaptureError> {
    let flattened = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let over_black = |c: u8| ((c as u16 * a as u16) / 255) as u8;
        Rgb([over_black(r), over_black(g), over_black(b)])
    });

    let mut buf = Vec::new();
    if flattened.width() > 0 && flattened.height() > 0 {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode(
                flattened.as_raw(),
                flattened.width(),
                flattened.height(),
                ColorType::Rgb8,
            )
            .map_err(|e| CaptureError::Encode {
                details: e.to_string(),
            })?;
    }

    if buf.is_empty() {
        return Err(CaptureError::EmptyEncode {
            mime_type: JPEG_MIME_TYPE.to_string(),
        });
    }

    Ok(Artifact::new(JPEG_MIME_TYPE, buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_letterbox_same_aspect_ratio() {
        let placement = letterbox((640, 360), (1280, 720));
        assert_close(placement.scale, 0.5);
        assert_close(placement.x, 0.0);
        assert_close(placement.y, 0.0);
        assert_close(placement.width, 640.0);
        assert_close(placement.height, 360.0);
    }

    #[test]
    fn test_letterbox_pillarbox_for_narrower_image() {
        // 4:3 into 16:9 leaves bars left and right
        let placement = letterbox((640, 360), (640, 480));
        assert_close(placement.scale, 0.75);
        assert_close(placement.width, 480.0);
        assert_close(placement.height, 360.0);
        assert_close(placement.x, 80.0);
        assert_close(placement.y, 0.0);
    }

    #[test]
    fn test_letterbox_bars_top_and_bottom_for_wider_image() {
        let placement = letterbox((640, 480), (1280, 720));
        assert_close(placement.scale, 0.5);
        assert_close(placement.x, 0.0);
        assert_close(placement.y, 60.0);
    }

    #[test]
    fn test_letterbox_upscales_small_images() {
        let placement = letterbox((640, 360), (320, 180));
        assert_close(placement.scale, 2.0);
        assert_close(placement.x, 0.0);
        assert_close(placement.y, 0.0);
    }

    #[test]
    fn test_draw_letterboxed_fills_bars_black() {
        let image = RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 255]));
        let canvas = draw_letterboxed((64, 36), &image);

        assert_eq!(canvas.dimensions(), (64, 36));
        // Scale 36/30 = 1.2 -> 48x36 centered at x = 8
        assert_eq!(*canvas.get_pixel(0, 18), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(63, 18), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(32, 18), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_bitmap_to_jpeg_encodes() {
        let image = RgbaImage::from_pixel(16, 16, Rgba([10, 200, 30, 255]));
        let artifact = bitmap_to_jpeg(&image, 100).unwrap();
        assert_eq!(artifact.mime_type(), JPEG_MIME_TYPE);
        assert_eq!(&artifact.data()[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(artifact.data()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn test_bitmap_to_jpeg_rejects_empty_bitmap() {
        let image = RgbaImage::new(0, 0);
        let err = bitmap_to_jpeg(&image, 100).unwrap_err();
        assert!(matches!(err, CaptureError::EmptyEncode { .. }));
    }
}
