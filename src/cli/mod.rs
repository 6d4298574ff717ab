// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::Args;

use anyhow::{bail, Result};
use colorful::Colorful;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ColorSchemeSource;
use crate::core::{create_wave_images, PipelineConfig};

const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "aac", "aiff"];

/// Run the CLI. Files that fail are reported and skipped; the run fails if
/// any file did.
pub fn run(args: &Args) -> Result<()> {
    if args.list_schemes {
        output::print_schemes();
        return Ok(());
    }

    let config = args.pipeline_config();
    config.validate()?;
    let scheme = args.scheme_source()?;

    let files: Vec<PathBuf> = args
        .files
        .iter()
        .flat_map(|input| collect_audio_files(input))
        .collect();

    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }

    println!("Found {} audio file(s)\n", files.len());

    let mut failed = 0;
    for file in &files {
        if let Err(e) = process_file(file, &config, &scheme) {
            log::debug!("{}: {:?}", file.display(), e);
            output::print_failure(file, &e);
            failed += 1;
        }
    }

    output::print_summary(files.len() - failed, failed);

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, files.len());
    }
    Ok(())
}

/// Expand `path` into audio files. Directories are walked recursively and
/// filtered by extension; explicit files are taken as given.
pub fn collect_audio_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && has_audio_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `<file name>_w.png` and `<file name>_s.jpg` next to the input. The
/// extension stays in the name so `kick.wav` and `kick.flac` don't collide.
pub fn output_paths(input: &Path) -> (PathBuf, PathBuf) {
    let name = input.file_name().unwrap_or_default().to_string_lossy();
    (
        input.with_file_name(format!("{}_w.png", name)),
        input.with_file_name(format!("{}_s.jpg", name)),
    )
}

fn process_file(path: &Path, config: &PipelineConfig, scheme: &ColorSchemeSource) -> Result<()> {
    output::print_file_header(path);
    let (waveform_path, spectrogram_path) = output_paths(path);

    let pb = output::progress_bar(config.width);
    let mut on_progress = |x: u32, _total: u32| pb.set_position(x as u64);
    let result = create_wave_images(
        path,
        &waveform_path,
        &spectrogram_path,
        config,
        scheme,
        Some(&mut on_progress),
    );
    pb.finish_and_clear();
    result?;

    output::print_success(&waveform_path, &spectrogram_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_output_paths() {
        let (w, s) = output_paths(Path::new("/tmp/sounds/kick.wav"));
        assert_eq!(w, PathBuf::from("/tmp/sounds/kick.wav_w.png"));
        assert_eq!(s, PathBuf::from("/tmp/sounds/kick.wav_s.jpg"));

        let (w, _) = output_paths(Path::new("take.2.flac"));
        assert_eq!(w, PathBuf::from("take.2.flac_w.png"));
    }

    #[test]
    fn test_same_stem_inputs_do_not_collide() {
        let wav = output_paths(Path::new("/music/kick.wav"));
        let flac = output_paths(Path::new("/music/kick.flac"));
        assert_ne!(wav.0, flac.0);
        assert_ne!(wav.1, flac.1);
    }

    #[test]
    fn test_collect_walks_directories() {
        let dir = std::env::temp_dir().join(format!("wav2png_collect_{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["b.wav", "a.FLAC", "notes.txt", "nested/c.ogg"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let files = collect_audio_files(&dir);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.FLAC", "b.wav", "nested/c.ogg"]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_explicit_file_kept() {
        let files = collect_audio_files(Path::new("/nonexistent/recording.xyz"));
        assert_eq!(files, vec![PathBuf::from("/nonexistent/recording.xyz")]);
    }
}
