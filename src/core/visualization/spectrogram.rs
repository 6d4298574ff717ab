// src/core/visualization/spectrogram.rs
//
// Log-frequency spectrogram built one column at a time.
//
// Pixels are appended column-major in scan order, so the buffer is really a
// sideways image; it is rotated once on finalize instead of scattering writes
// across rows in the hot loop.

use image::{imageops, RgbImage};

use crate::config::{ColorScheme, SchemeError};
use crate::core::palette::Palette;

const FREQ_MIN: f64 = 100.0;
const FREQ_MAX: f64 = 22050.0;

pub struct SpectrogramRenderer {
    width: u32,
    height: u32,
    palette: Palette,
    /// (lower bin, weight of the upper bin) per row, lowest frequency first
    y_to_bin: Vec<(usize, f64)>,
    /// RGB triples, `height` per column
    pixels: Vec<u8>,
    columns: u32,
}

impl SpectrogramRenderer {
    pub fn new(
        width: u32,
        height: u32,
        fft_size: usize,
        scheme: &ColorScheme,
    ) -> Result<Self, SchemeError> {
        let palette = Palette::new(&scheme.spec_colors)?;
        let y_to_bin = row_to_bin_table(height, fft_size);

        if (y_to_bin.len() as u32) < height {
            log::debug!(
                "FFT size {} only covers {} of {} spectrogram rows",
                fft_size,
                y_to_bin.len(),
                height
            );
        }

        Ok(Self {
            width,
            height,
            palette,
            y_to_bin,
            pixels: Vec::with_capacity(width as usize * height as usize * 3),
            columns: 0,
        })
    }

    /// Append column `x`. Columns must arrive in order; extras past the image
    /// width are dropped.
    pub fn draw_column(&mut self, x: u32, db_spectrum: &[f64]) {
        debug_assert_eq!(x, self.columns, "spectrogram columns must be drawn in order");
        if self.columns >= self.width {
            return;
        }

        for &(bin, weight) in &self.y_to_bin {
            let lower = db_spectrum.get(bin).copied().unwrap_or(0.0);
            let upper = db_spectrum.get(bin + 1).copied().unwrap_or(0.0);
            let value = lower + weight * (upper - lower);
            let color = self.palette.get((value * 255.0).max(0.0) as usize);
            self.pixels.extend_from_slice(&color);
        }

        // rows the FFT cannot reach stay at the quietest color
        let floor = self.palette.first();
        for _ in self.y_to_bin.len()..self.height as usize {
            self.pixels.extend_from_slice(&floor);
        }

        self.columns += 1;
    }

    /// Rotate the accumulated columns into an upright image, low frequencies
    /// at the bottom. Undrawn columns are filled with the quietest color.
    pub fn finalize(mut self) -> RgbImage {
        let expected = self.width as usize * self.height as usize * 3;
        let floor = self.palette.first();
        while self.pixels.len() < expected {
            self.pixels.extend_from_slice(&floor);
        }

        // one row per drawn column, one pixel per frequency row
        match RgbImage::from_raw(self.height, self.width, self.pixels) {
            Some(sideways) => imageops::rotate270(&sideways),
            None => RgbImage::new(self.width, self.height),
        }
    }
}

/// Map each output row to a fractional FFT bin on a log axis from 100 Hz to
/// 22050 Hz, stopping at the first row beyond the last usable bin.
fn row_to_bin_table(height: u32, fft_size: usize) -> Vec<(usize, f64)> {
    let log_min = FREQ_MIN.log10();
    let log_max = FREQ_MAX.log10();
    let half = fft_size / 2;
    let steps = height.saturating_sub(1).max(1) as f64;

    let mut table = Vec::with_capacity(height as usize);
    for y in 0..height {
        let freq = 10f64.powf(log_min + y as f64 / steps * (log_max - log_min));
        let bin = freq / FREQ_MAX * (half + 1) as f64;
        if bin >= half as f64 {
            break;
        }
        table.push((bin as usize, bin.fract()));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_scheme() -> ColorScheme {
        ColorScheme {
            wave_colors: vec![[0, 0, 0], [255, 255, 255]],
            spec_colors: vec![[0, 0, 0], [255, 255, 255]],
            wave_transparent_background: false,
            wave_zero_line_alpha: 0,
        }
    }

    #[test]
    fn test_table_is_monotonic_and_bounded() {
        let table = row_to_bin_table(171, 2048);
        assert!(!table.is_empty());
        assert!(table.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(table.iter().all(|&(bin, w)| bin < 1024 && (0.0..1.0).contains(&w)));
        // 100 Hz at the bottom row
        assert_eq!(table[0].0, (100.0 / 22050.0 * 1025.0) as usize);
    }

    #[test]
    fn test_small_fft_leaves_rows_uncovered() {
        let table = row_to_bin_table(100, 64);
        assert!(table.len() < 100);
    }

    #[test]
    fn test_dimensions_and_orientation() {
        let mut renderer = SpectrogramRenderer::new(3, 5, 64, &gray_scheme()).unwrap();
        let loud = vec![1.0; 33];
        let quiet = vec![0.0; 33];
        renderer.draw_column(0, &loud);
        renderer.draw_column(1, &quiet);
        renderer.draw_column(2, &loud);

        let image = renderer.finalize();
        assert_eq!(image.dimensions(), (3, 5));

        // the bottom row is the lowest frequency and always covered
        assert_eq!(image.get_pixel(0, 4).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(1, 4).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(2, 4).0, [255, 255, 255]);
        // with a 64-point FFT the top row is out of range and stays dark
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_interpolates_between_bins() {
        let mut renderer = SpectrogramRenderer::new(1, 1, 4096, &gray_scheme()).unwrap();
        let (bin, weight) = renderer.y_to_bin[0];
        let mut spectrum = vec![0.0; 2049];
        spectrum[bin + 1] = 1.0;
        renderer.draw_column(0, &spectrum);
        let expected = renderer.palette.get((weight * 255.0) as usize);

        let image = renderer.finalize();
        assert_eq!(image.get_pixel(0, 0).0, expected);
        assert!(expected[0] > 0 && expected[0] < 255);
    }

    #[test]
    fn test_missing_columns_filled() {
        let mut renderer = SpectrogramRenderer::new(4, 3, 2048, &gray_scheme()).unwrap();
        renderer.draw_column(0, &vec![1.0; 1025]);
        let image = renderer.finalize();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(3, 2).0, [0, 0, 0]);
    }
}
