// src/core/visualization/waveform.rs
//
// Column-by-column waveform rasterizer. Each column draws the peak pair as a
// vertical stroke joined to the previous column, colored by spectral centroid.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::config::{ColorScheme, Rgb8, SchemeError};
use crate::core::analyzer::PeakPair;
use crate::core::palette::Palette;

/// End point of the previously drawn column
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderCursor {
    previous: Option<(f32, f32)>,
}

impl RenderCursor {
    pub fn previous(&self) -> Option<(f32, f32)> {
        self.previous
    }
}

pub struct WaveformRenderer {
    image: RgbaImage,
    width: u32,
    height: u32,
    palette: Palette,
    transparent: bool,
    zero_line_alpha: u8,
    cursor: RenderCursor,
}

impl WaveformRenderer {
    pub fn new(width: u32, height: u32, scheme: &ColorScheme) -> Result<Self, SchemeError> {
        if height % 2 == 0 {
            log::warn!("Waveform height {} is even; images look better at an odd height", height);
        }

        let anchors = &scheme.wave_colors;
        let background = *anchors.first().ok_or(SchemeError::EmptyPalette)?;
        // the first anchor is reserved for the background
        let line_anchors = if anchors.len() > 1 { &anchors[1..] } else { &anchors[..] };
        let palette = Palette::new(line_anchors)?;

        let transparent = scheme.wave_transparent_background;
        let fill = if transparent {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([background[0], background[1], background[2], 255])
        };

        Ok(Self {
            image: RgbaImage::from_pixel(width, height, fill),
            width,
            height,
            palette,
            transparent,
            zero_line_alpha: scheme.wave_zero_line_alpha,
            cursor: RenderCursor::default(),
        })
    }

    pub fn cursor(&self) -> RenderCursor {
        self.cursor
    }

    /// Row for a sample value, leaving a 2px margin top and bottom
    fn peak_to_y(&self, peak: f32) -> f32 {
        let h = self.height as f32;
        h * 0.5 - peak * (h - 4.0) * 0.5
    }

    /// Draw column `x`. Columns must arrive in increasing `x` order.
    pub fn draw_column(&mut self, x: u32, peaks: PeakPair, centroid: f64) {
        let y1 = self.peak_to_y(peaks.first);
        let y2 = self.peak_to_y(peaks.second);
        let color = self.palette.lookup(centroid);
        let stroke = Rgba([color[0], color[1], color[2], 255]);
        let xf = x as f32;

        if let Some(previous) = self.cursor.previous {
            draw_line_segment_mut(&mut self.image, previous, (xf, y1), stroke);
        }
        draw_line_segment_mut(&mut self.image, (xf, y1), (xf, y2), stroke);

        self.cursor.previous = Some((xf, y2));

        self.draw_anti_aliased_pixels(x, y1, y2, color);
    }

    /// Vertical anti-aliasing on the rows just outside the stroke
    fn draw_anti_aliased_pixels(&mut self, x: u32, y1: f32, y2: f32, color: Rgb8) {
        let y_max = y1.max(y2);
        let y_max_int = y_max.trunc();
        let alpha = y_max - y_max_int;
        if alpha > 0.0 && alpha < 1.0 && y_max_int + 1.0 < self.height as f32 {
            self.blend(x, (y_max_int + 1.0) as u32, color, alpha);
        }

        // the lower extremum blends into its own neighbour row above
        let y_min = y1.min(y2);
        let y_min_int = y_min.trunc();
        let alpha = 1.0 - (y_min - y_min_int);
        if alpha > 0.0 && alpha < 1.0 && y_min_int - 1.0 >= 0.0 {
            self.blend(x, (y_min_int - 1.0) as u32, color, alpha);
        }
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgb8, alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }

        let pixel = self.image.get_pixel_mut(x, y);
        if self.transparent {
            // nothing to blend against
            *pixel = Rgba([color[0], color[1], color[2], 255]);
        } else {
            for c in 0..3 {
                pixel.0[c] = ((1.0 - alpha) * pixel.0[c] as f32 + alpha * color[c] as f32) as u8;
            }
        }
    }

    /// Apply the zero line and hand back the finished image.
    ///
    /// The result is RGBA for transparent schemes and RGB otherwise.
    pub fn finalize(mut self) -> DynamicImage {
        if self.zero_line_alpha > 0 && self.height > 0 {
            let center = self.height / 2;
            let alpha = self.zero_line_alpha;
            for x in 0..self.width {
                let pixel = self.image.get_pixel_mut(x, center);
                for channel in pixel.0.iter_mut() {
                    *channel = channel.saturating_add(alpha);
                }
            }
        }

        let image = DynamicImage::ImageRgba8(self.image);
        if self.transparent {
            image
        } else {
            DynamicImage::ImageRgb8(image.into_rgb8())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_scheme() -> ColorScheme {
        ColorScheme {
            wave_colors: vec![[10, 20, 30], [200, 0, 0], [0, 0, 200]],
            spec_colors: vec![[0, 0, 0], [255, 255, 255]],
            wave_transparent_background: false,
            wave_zero_line_alpha: 0,
        }
    }

    #[test]
    fn test_background_and_format() {
        let renderer = WaveformRenderer::new(8, 9, &opaque_scheme()).unwrap();
        let image = renderer.finalize();
        assert!(matches!(image, DynamicImage::ImageRgb8(_)));
        assert_eq!(image.to_rgb8().get_pixel(3, 3).0, [10, 20, 30]);

        let mut scheme = opaque_scheme();
        scheme.wave_transparent_background = true;
        let image = WaveformRenderer::new(8, 9, &scheme).unwrap().finalize();
        assert!(matches!(image, DynamicImage::ImageRgba8(_)));
        assert_eq!(image.to_rgba8().get_pixel(3, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_stroke_covers_peak_span() {
        let mut renderer = WaveformRenderer::new(4, 21, &opaque_scheme()).unwrap();
        // centroid 0 picks the first line anchor, not the background
        renderer.draw_column(1, PeakPair::new(1.0, -1.0), 0.0);

        let image = renderer.finalize().to_rgb8();
        // peaks at +-1 map to rows 2 and 19
        for y in 2..=19 {
            assert_eq!(image.get_pixel(1, y).0, [200, 0, 0], "row {}", y);
        }
        assert_eq!(image.get_pixel(1, 0).0, [10, 20, 30]);
        assert_eq!(image.get_pixel(0, 10).0, [10, 20, 30]);
    }

    #[test]
    fn test_cursor_connects_columns() {
        let mut renderer = WaveformRenderer::new(4, 21, &opaque_scheme()).unwrap();
        assert_eq!(renderer.cursor().previous(), None);

        renderer.draw_column(0, PeakPair::new(1.0, 1.0), 1.0);
        assert_eq!(renderer.cursor().previous(), Some((0.0, 2.0)));

        renderer.draw_column(3, PeakPair::new(1.0, 1.0), 1.0);
        let image = renderer.finalize().to_rgb8();
        // the joining segment passes through the skipped columns
        assert_eq!(image.get_pixel(1, 2).0, [0, 0, 200]);
        assert_eq!(image.get_pixel(2, 2).0, [0, 0, 200]);
        assert_eq!(image.get_pixel(1, 3).0, [10, 20, 30]);
    }

    #[test]
    fn test_anti_aliasing_blends_neighbour() {
        let mut renderer = WaveformRenderer::new(2, 11, &opaque_scheme()).unwrap();
        // y = 5.5 - 0.25 * 3.5 = 4.625 for both extrema
        renderer.draw_column(0, PeakPair::new(0.25, 0.25), 0.0);
        let image = renderer.finalize().to_rgb8();

        // below: alpha 0.625 of the stroke at row 5
        let below = image.get_pixel(0, 5).0;
        assert_eq!(below, [128, 7, 11]);
        // above: alpha 0.375 at row 3
        let above = image.get_pixel(0, 3).0;
        assert_eq!(above, [81, 12, 18]);

        // transparent background: neighbours take the stroke color outright
        let mut scheme = opaque_scheme();
        scheme.wave_transparent_background = true;
        let mut renderer = WaveformRenderer::new(2, 11, &scheme).unwrap();
        renderer.draw_column(0, PeakPair::new(0.25, 0.25), 0.0);
        let image = renderer.finalize().to_rgba8();

        assert_eq!(image.get_pixel(0, 5).0, [200, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 3).0, [200, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_zero_line_saturates() {
        let scheme = ColorScheme {
            wave_colors: vec![[250, 100, 0], [0, 0, 0]],
            spec_colors: vec![[0, 0, 0]],
            wave_transparent_background: false,
            wave_zero_line_alpha: 25,
        };
        let image = WaveformRenderer::new(3, 7, &scheme).unwrap().finalize().to_rgb8();
        assert_eq!(image.get_pixel(1, 3).0, [255, 125, 25]);
        assert_eq!(image.get_pixel(1, 2).0, [250, 100, 0]);
    }

    #[test]
    fn test_empty_scheme_rejected() {
        let scheme = ColorScheme {
            wave_colors: vec![],
            spec_colors: vec![[0, 0, 0]],
            wave_transparent_background: false,
            wave_zero_line_alpha: 0,
        };
        assert!(WaveformRenderer::new(4, 5, &scheme).is_err());
    }
}
