// src/config/schemes.rs
//
// Named color schemes and inline scheme loading

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 8-bit RGB triple
pub type Rgb8 = [u8; 3];

pub const DEFAULT_COLOR_SCHEME_KEY: &str = "BleepBloop";

const SCHEME_NAMES: &[&str] = &[
    "Freesound2",
    "FreesoundBeastWhoosh",
    "FreesoundBeastWhooshOld",
    "BeastLol",
    "Cyberpunk",
    "Rainforest",
    "CrazyColors",
    "CrazyCrayons",
    "CreepyCrayons",
    "BleepBloop",
];

/// Errors building palettes or loading color schemes
#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("color scheme has no anchor colors")]
    EmptyPalette,

    #[error("failed to read color scheme {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid color scheme {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anchor colors and flags for both images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    /// Waveform anchors; the first entry is the background when opaque
    pub wave_colors: Vec<Rgb8>,
    /// Spectrogram anchors, low energy first
    pub spec_colors: Vec<Rgb8>,
    #[serde(default)]
    pub wave_transparent_background: bool,
    /// Added to the center row on save; 0 disables the zero line
    #[serde(default)]
    pub wave_zero_line_alpha: u8,
}

impl Default for ColorScheme {
    fn default() -> Self {
        bleep_bloop()
    }
}

/// Where a color scheme comes from, resolved once before rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSchemeSource {
    Named(String),
    Inline(ColorScheme),
}

impl Default for ColorSchemeSource {
    fn default() -> Self {
        ColorSchemeSource::Named(DEFAULT_COLOR_SCHEME_KEY.to_string())
    }
}

impl ColorSchemeSource {
    /// Resolve to a concrete scheme. Unknown names fall back to the default.
    pub fn resolve(&self) -> ColorScheme {
        match self {
            ColorSchemeSource::Named(name) => lookup(name).unwrap_or_else(|| {
                log::warn!(
                    "Unknown color scheme '{}', using {}",
                    name,
                    DEFAULT_COLOR_SCHEME_KEY
                );
                ColorScheme::default()
            }),
            ColorSchemeSource::Inline(scheme) => scheme.clone(),
        }
    }
}

/// All registered scheme names
pub fn scheme_names() -> &'static [&'static str] {
    SCHEME_NAMES
}

/// Look up a named scheme
pub fn lookup(name: &str) -> Option<ColorScheme> {
    let scheme = match name {
        "Freesound2" => ColorScheme {
            wave_colors: vec![
                [0, 0, 0],
                [50, 0, 200],
                [0, 220, 80],
                [255, 224, 0],
                [255, 70, 0],
            ],
            spec_colors: vec![
                [0, 0, 0],
                [58 / 4, 68 / 4, 65 / 4],
                [80 / 2, 100 / 2, 153 / 2],
                [90, 180, 100],
                [224, 224, 44],
                [255, 60, 30],
                [255, 255, 255],
            ],
            wave_transparent_background: false,
            wave_zero_line_alpha: 25,
        },
        "FreesoundBeastWhoosh" => ColorScheme {
            wave_colors: vec![
                [20, 20, 36],
                [29, 159, 181],
                [0, 220, 80],
                [255, 200, 58],
                [255, 0, 70],
            ],
            spec_colors: vec![
                [20, 20, 36],
                [0, 18, 25],
                [0, 37, 56],
                [11, 95, 118],
                [29, 159, 181],
                [0, 220, 80],
                [255, 200, 58],
                [255, 125, 0],
                [255, 0, 70],
                [255, 0, 20],
            ],
            wave_transparent_background: true,
            wave_zero_line_alpha: 12,
        },
        "FreesoundBeastWhooshOld" => ColorScheme {
            wave_colors: vec![
                [255, 255, 255],
                [29, 159, 181],
                [28, 174, 72],
                [255, 158, 53],
                [255, 53, 70],
            ],
            spec_colors: vec![
                [0, 0, 0],
                [29, 159, 181],
                [28, 174, 72],
                [255, 158, 53],
                [255, 53, 70],
            ],
            wave_transparent_background: false,
            wave_zero_line_alpha: 0,
        },
        "BeastLol" => ColorScheme {
            wave_colors: vec![
                [20, 20, 36],
                [29, 159, 201],
                [20, 240, 80],
                [255, 200, 78],
                [255, 0, 90],
            ],
            spec_colors: vec![
                [20, 20, 16],
                [0, 28, 25],
                [0, 37, 66],
                [31, 75, 118],
                [39, 189, 181],
                [0, 200, 100],
                [255, 220, 78],
                [255, 145, 20],
                [255, 0, 90],
                [235, 0, 20],
            ],
            wave_transparent_background: true,
            wave_zero_line_alpha: 12,
        },
        "Cyberpunk" => {
            let colors: Vec<Rgb8> = std::iter::once([0, 0, 0])
                .chain((0..30).map(|i| color_from_value(i as f64 / 29.0)))
                .collect();
            ColorScheme {
                wave_colors: colors.clone(),
                spec_colors: colors,
                wave_transparent_background: false,
                wave_zero_line_alpha: 0,
            }
        }
        "Rainforest" => {
            let colors: Vec<Rgb8> = std::iter::once([213, 217, 221])
                .chain(
                    [[50, 0, 200], [0, 220, 80], [255, 224, 0]]
                        .into_iter()
                        .map(|c| desaturate(c, 0.7)),
                )
                .collect();
            ColorScheme {
                wave_colors: colors.clone(),
                spec_colors: colors,
                wave_transparent_background: false,
                wave_zero_line_alpha: 0,
            }
        }
        "CrazyColors" => ColorScheme {
            wave_colors: vec![
                [20, 20, 36],
                [28, 36, 20],
                [28, 236, 20],
                [28, 36, 220],
                [220, 24, 4],
            ],
            spec_colors: vec![
                [18, 18, 202],
                [111, 111, 11],
                [111, 5, 11],
                [211, 111, 221],
                [212, 255, 0],
            ],
            wave_transparent_background: true,
            wave_zero_line_alpha: 25,
        },
        "CrazyCrayons" => ColorScheme {
            wave_colors: vec![
                [0, 220, 80],
                [100, 150, 200],
                [0, 0, 0],
                [200, 100, 50],
                [255, 204, 204],
                [255, 0, 100],
                [228, 254, 32],
                [0, 0, 0],
                [0, 100, 200],
            ],
            spec_colors: vec![
                [255, 0, 0],
                [255, 128, 0],
                [0, 0, 0],
                [6, 254, 147],
                [128, 255, 0],
                [0, 255, 128],
                [0, 0, 0],
                [0, 255, 255],
                [0, 128, 255],
                [0, 8, 117],
                [0, 0, 0],
                [128, 0, 255],
                [255, 0, 255],
            ],
            wave_transparent_background: true,
            wave_zero_line_alpha: 15,
        },
        "CreepyCrayons" => ColorScheme {
            wave_colors: vec![
                [0, 220, 80],
                [100, 150, 200],
                [200, 100, 50],
                [255, 0, 100],
                [0, 100, 200],
            ],
            spec_colors: vec![
                [255, 0, 0],
                [255, 128, 0],
                [255, 255, 0],
                [128, 255, 0],
                [0, 255, 128],
                [0, 255, 255],
                [0, 128, 255],
                [0, 0, 255],
                [128, 0, 255],
                [255, 0, 255],
            ],
            wave_transparent_background: true,
            wave_zero_line_alpha: 12,
        },
        "BleepBloop" => bleep_bloop(),
        _ => return None,
    };
    Some(scheme)
}

fn bleep_bloop() -> ColorScheme {
    ColorScheme {
        wave_colors: vec![
            [20, 20, 36],
            [0, 145, 255],
            [10, 255, 129],
            [212, 255, 0],
            [255, 0, 90],
        ],
        spec_colors: vec![
            [20, 20, 16],
            [0, 28, 25],
            [0, 37, 66],
            [0, 77, 153],
            [19, 201, 192],
            [0, 200, 100],
            [255, 204, 0],
            [255, 136, 0],
            [255, 0, 90],
            [255, 17, 0],
        ],
        wave_transparent_background: true,
        wave_zero_line_alpha: 12,
    }
}

/// Load an inline scheme from a JSON file
pub fn load_scheme_file(path: &Path) -> Result<ColorScheme, SchemeError> {
    let content = std::fs::read_to_string(path).map_err(|source| SchemeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let scheme: ColorScheme =
        serde_json::from_str(&content).map_err(|source| SchemeError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if scheme.wave_colors.is_empty() || scheme.spec_colors.is_empty() {
        return Err(SchemeError::EmptyPalette);
    }
    Ok(scheme)
}

/// Hue sweep used by the Cyberpunk scheme: `hsl((1 - v) * 360, 80%, 50%)`
fn color_from_value(value: f64) -> Rgb8 {
    let hue = ((1.0 - value) * 360.0) as i32;
    hsl_to_rgb(hue as f64 / 360.0, 0.8, 0.5)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb8 {
    let to_byte = |v: f64| (v * 255.0 + 0.5) as u8;
    if s == 0.0 {
        let v = to_byte(l);
        return [v, v, v];
    }

    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    let channel = |hue: f64| {
        let hue = hue.rem_euclid(1.0);
        if hue < 1.0 / 6.0 {
            m1 + (m2 - m1) * hue * 6.0
        } else if hue < 0.5 {
            m2
        } else if hue < 2.0 / 3.0 {
            m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
        } else {
            m1
        }
    };

    [
        to_byte(channel(h + 1.0 / 3.0)),
        to_byte(channel(h)),
        to_byte(channel(h - 1.0 / 3.0)),
    ]
}

/// Pull a color toward its luminosity; 0 keeps it, 1 makes it grey
fn desaturate(rgb: Rgb8, amount: f64) -> Rgb8 {
    let luminosity = rgb.iter().map(|&c| c as f64).sum::<f64>() / 3.0;
    rgb.map(|c| (c as f64 - amount * (c as f64 - luminosity)) as u8)
}
