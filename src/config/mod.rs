//! Configuration module for wav2png

mod schemes;

pub use schemes::{
    load_scheme_file, lookup, scheme_names, ColorScheme, ColorSchemeSource, Rgb8, SchemeError,
    DEFAULT_COLOR_SCHEME_KEY,
};
