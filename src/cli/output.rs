//! Terminal output: progress bars and per-file status lines

use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::config::{scheme_names, DEFAULT_COLOR_SCHEME_KEY};

/// Column progress bar for one file
pub fn progress_bar(columns: u32) -> ProgressBar {
    let pb = ProgressBar::new(columns as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} columns")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

pub fn print_file_header(path: &Path) {
    println!("Rendering: {}", path.display().to_string().cyan());
}

pub fn print_success(waveform: &Path, spectrogram: &Path) {
    println!("  {} {}", "✓".green(), waveform.display());
    println!("  {} {}", "✓".green(), spectrogram.display());
}

pub fn print_failure(path: &Path, error: &anyhow::Error) {
    println!("  {} {}", "✗ FAILED".red(), path.display());
    println!("    • {}", format!("{:#}", error).yellow());
}

pub fn print_summary(succeeded: usize, failed: usize) {
    println!();
    if failed == 0 {
        println!("{}", format!("Done: {} file(s) rendered", succeeded).green());
    } else {
        println!(
            "{}",
            format!("Done: {} file(s) rendered, {} failed", succeeded, failed).red()
        );
    }
}

pub fn print_schemes() {
    println!("Available color schemes:");
    for name in scheme_names() {
        if *name == DEFAULT_COLOR_SCHEME_KEY {
            println!("  {} {}", name.bold(), "(default)".dim());
        } else {
            println!("  {}", name);
        }
    }
}
