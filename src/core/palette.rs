// src/core/palette.rs
//
// Dense color lookup tables interpolated from a handful of anchor colors

use crate::config::{Rgb8, SchemeError};

/// Number of entries in every palette the renderers use
pub const PALETTE_SIZE: usize = 256;

/// Read-only color lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb8>,
}

impl Palette {
    /// Build a [`PALETTE_SIZE`]-entry palette from anchor colors
    pub fn new(anchors: &[Rgb8]) -> Result<Self, SchemeError> {
        build_palette(anchors, PALETTE_SIZE)
    }

    /// Entry at `index`, clamped to the last entry
    pub fn get(&self, index: usize) -> Rgb8 {
        self.colors[index.min(self.colors.len() - 1)]
    }

    /// Entry for a value in `[0, 1]`, rounded to the nearest index
    pub fn lookup(&self, value: f64) -> Rgb8 {
        let max = (self.colors.len() - 1) as f64;
        let index = (value * max).round().clamp(0.0, max);
        self.colors[index as usize]
    }

    pub fn first(&self) -> Rgb8 {
        self.colors[0]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn as_slice(&self) -> &[Rgb8] {
        &self.colors
    }
}

/// Linearly interpolate `anchors` into `size` colors.
///
/// Channels are truncated, not rounded. A single anchor fills the whole table.
pub fn build_palette(anchors: &[Rgb8], size: usize) -> Result<Palette, SchemeError> {
    if anchors.is_empty() || size == 0 {
        return Err(SchemeError::EmptyPalette);
    }

    let span = (anchors.len() - 1) as f64;
    let steps = size.saturating_sub(1).max(1) as f64;

    let colors = (0..size)
        .map(|i| {
            let position = i as f64 * span / steps;
            let lower = position as usize;
            let alpha = position - lower as f64;

            if alpha > 0.0 {
                let (a, b) = (anchors[lower], anchors[lower + 1]);
                [0, 1, 2].map(|c| ((1.0 - alpha) * a[c] as f64 + alpha * b[c] as f64) as u8)
            } else {
                anchors[lower]
            }
        })
        .collect();

    Ok(Palette { colors })
}
