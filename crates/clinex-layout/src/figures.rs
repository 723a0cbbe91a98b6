//! Figure reconstruction from intercepted raster drawing operators.
//!
//! Buffers arrive in their declared color space, intercepted before
//! rasterization; every surviving figure is normalized to RGBA and encoded
//! as a base64 PNG payload. Malformed buffers are skipped with a warning
//! rather than aborting page processing.

use base64::Engine;
use clinex_core::config::LayoutConfig;
use clinex_core::types::{ColorSpace, ExtractedFigure, ImageOperator};
use tracing::{debug, warn};

/// Reconstruct figures from one page's raster operator stream.
///
/// Operators whose page-space footprint is below the minimum extent are
/// decorative glyphs or icons, not content figures, and are dropped.
#[must_use]
pub fn extract_figures(
    page: u32,
    operators: &[ImageOperator],
    config: &LayoutConfig,
) -> Vec<ExtractedFigure> {
    let mut figures = Vec::new();

    for operator in operators {
        let bounding_box = operator.transform.unit_square_bbox();
        if bounding_box.width < config.min_figure_extent_px
            || bounding_box.height < config.min_figure_extent_px
        {
            debug!(
                page,
                width = bounding_box.width,
                height = bounding_box.height,
                "skipping sub-footprint raster operator"
            );
            continue;
        }

        let rgba = match to_rgba(operator) {
            Some(rgba) => rgba,
            None => {
                warn!(
                    page,
                    kind = ?operator.kind,
                    color_space = ?operator.color_space,
                    "skipping malformed raster operator"
                );
                continue;
            }
        };

        let raster_data = match encode_png_base64(&rgba, operator.width, operator.height) {
            Some(encoded) => encoded,
            None => {
                warn!(page, kind = ?operator.kind, "skipping unencodable raster operator");
                continue;
            }
        };

        figures.push(ExtractedFigure {
            id: format!("p{page}_figure{}", figures.len() + 1),
            page,
            raster_data,
            bounding_box,
            width: operator.width,
            height: operator.height,
        });
    }

    figures
}

/// Convert a declared-color-space buffer to RGBA, or `None` when the buffer
/// length does not match the declared geometry.
fn to_rgba(operator: &ImageOperator) -> Option<Vec<u8>> {
    let pixels = operator.width as usize * operator.height as usize;
    let mut rgba = Vec::with_capacity(pixels * 4);

    match operator.color_space {
        ColorSpace::Rgb => {
            if operator.data.len() != pixels * 3 {
                return None;
            }
            for chunk in operator.data.chunks_exact(3) {
                rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
            }
        }
        ColorSpace::Grayscale => {
            if operator.data.len() != pixels {
                return None;
            }
            for &value in &operator.data {
                rgba.extend_from_slice(&[value, value, value, 255]);
            }
        }
        ColorSpace::Cmyk => {
            if operator.data.len() != pixels * 4 {
                return None;
            }
            for chunk in operator.data.chunks_exact(4) {
                let (c, m, y, k) = (
                    f64::from(chunk[0]),
                    f64::from(chunk[1]),
                    f64::from(chunk[2]),
                    f64::from(chunk[3]),
                );
                let r = 255.0 * (1.0 - c / 255.0) * (1.0 - k / 255.0);
                let g = 255.0 * (1.0 - m / 255.0) * (1.0 - k / 255.0);
                let b = 255.0 * (1.0 - y / 255.0) * (1.0 - k / 255.0);
                rgba.extend_from_slice(&[r.round() as u8, g.round() as u8, b.round() as u8, 255]);
            }
        }
    }

    Some(rgba)
}

/// Encode RGBA pixels as a base64 PNG payload.
fn encode_png_base64(rgba: &[u8], width: u32, height: u32) -> Option<String> {
    let buffer = image::RgbaImage::from_raw(width, height, rgba.to_vec())?;
    let mut png = std::io::Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, image::ImageFormat::Png)
        .ok()?;
    Some(base64::engine::general_purpose::STANDARD.encode(png.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinex_core::geometry::PageTransform;
    use clinex_core::types::ImageOperatorKind;

    fn operator(color_space: ColorSpace, data: Vec<u8>, extent: f64) -> ImageOperator {
        ImageOperator {
            kind: ImageOperatorKind::ImageObject,
            data,
            color_space,
            width: 2,
            height: 2,
            transform: PageTransform::scale_translate(extent, extent, 10.0, 10.0),
        }
    }

    #[test]
    fn test_grayscale_replicates_channels() {
        let rgba = to_rgba(&operator(ColorSpace::Grayscale, vec![0, 128, 200, 255], 100.0))
            .unwrap();
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
        assert_eq!(&rgba[12..16], &[255, 255, 255, 255]);
    }

    #[test]
    fn test_rgb_forces_full_opacity() {
        let data = vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let rgba = to_rgba(&operator(ColorSpace::Rgb, data, 100.0)).unwrap();
        assert_eq!(&rgba[0..4], &[10, 20, 30, 255]);
        assert_eq!(rgba.len(), 16);
    }

    #[test]
    fn test_cmyk_subtractive_conversion() {
        // Pure black (k=255) and pure white (all zero).
        let data = vec![0, 0, 0, 255, 0, 0, 0, 0, 255, 0, 0, 0, 0, 255, 0, 0];
        let rgba = to_rgba(&operator(ColorSpace::Cmyk, data, 100.0)).unwrap();
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[255, 255, 255, 255]);
        // Full cyan: no red, full green and blue.
        assert_eq!(&rgba[8..12], &[0, 255, 255, 255]);
        // Full magenta: no green.
        assert_eq!(&rgba[12..16], &[255, 0, 255, 255]);
    }

    #[test]
    fn test_buffer_length_mismatch_is_skipped() {
        let config = LayoutConfig::default();
        let truncated = operator(ColorSpace::Rgb, vec![1, 2, 3], 100.0);
        assert!(extract_figures(1, &[truncated], &config).is_empty());
    }

    #[test]
    fn test_sub_footprint_operators_dropped() {
        let config = LayoutConfig::default();
        let icon = operator(ColorSpace::Grayscale, vec![0, 0, 0, 0], 20.0);
        assert!(extract_figures(1, &[icon], &config).is_empty());
    }

    #[test]
    fn test_extracted_figure_shape() {
        let config = LayoutConfig::default();
        let figure = operator(ColorSpace::Grayscale, vec![0, 64, 128, 255], 100.0);
        let figures = extract_figures(3, &[figure], &config);
        assert_eq!(figures.len(), 1);
        let figure = &figures[0];
        assert_eq!(figure.id, "p3_figure1");
        assert_eq!(figure.page, 3);
        assert_eq!(figure.bounding_box.x, 10.0);
        assert_eq!(figure.bounding_box.width, 100.0);
        assert!(!figure.raster_data.is_empty());
        // Payload decodes back to a PNG header.
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&figure.raster_data)
            .unwrap();
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn test_one_bad_operator_does_not_poison_the_page() {
        let config = LayoutConfig::default();
        let bad = operator(ColorSpace::Cmyk, vec![1, 2], 100.0);
        let good = operator(ColorSpace::Grayscale, vec![0, 64, 128, 255], 100.0);
        let figures = extract_figures(1, &[bad, good], &config);
        assert_eq!(figures.len(), 1);
    }
}
