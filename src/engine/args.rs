//! Per-stage argument builders
//!
//! Each builder reads [`NormalizedOptions`] and produces the argument vector
//! for one stage. The builders are independent of each other.

use serde::Serialize;
use tracing::debug;

use crate::domain::model::{NormalizedOptions, Stage};

/// ffmpeg input designator for "read standard input"
pub const STDIN_INPUT: &str = "pipe:0";

/// Argument vectors for all three stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelinePlan {
    pub extract: Vec<String>,
    pub convert: Vec<String>,
    pub optimize: Vec<String>,
}

impl PipelinePlan {
    /// Build all three argument vectors
    pub fn build(options: &NormalizedOptions) -> Self {
        Self {
            extract: extract_args(options),
            convert: convert_args(options),
            optimize: optimize_args(options),
        }
    }

    /// Arguments for one stage
    pub fn args(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Extract => &self.extract,
            Stage::Convert => &self.convert,
            Stage::Optimize => &self.optimize,
        }
    }
}

/// ffmpeg: seek, decode, filter and emit a PPM frame sequence on stdout
pub fn extract_args(options: &NormalizedOptions) -> Vec<String> {
    let mut args = vec!["-loglevel".to_string(), "panic".to_string()];

    // -ss before -i selects ffmpeg's fast input seeking
    if let Some(from) = &options.from {
        args.push("-ss".to_string());
        args.push(from.to_fixed_width());
    }

    args.push("-i".to_string());
    match &options.input_path {
        Some(path) => args.push(path.to_string_lossy().into_owned()),
        None => args.push(STDIN_INPUT.to_string()),
    }

    if let Some(to) = &options.to {
        args.push("-to".to_string());
        args.push(to.to_fixed_width());
    }

    args.push("-r".to_string());
    args.push(options.fps.to_string());

    if let Some(filters) = filter_chain(options) {
        args.push("-vf".to_string());
        args.push(filters);
    }

    args.extend(
        ["-f", "image2pipe", "-vcodec", "ppm", "pipe:1"]
            .iter()
            .map(|s| s.to_string()),
    );

    debug!(stage = %Stage::Extract, ?args, "Computed stage arguments");
    args
}

/// Filter graph for ffmpeg: scale, subtitles, reverse, in that order
pub fn filter_chain(options: &NormalizedOptions) -> Option<String> {
    let mut filters = Vec::new();

    if let Some(resize) = &options.resize {
        filters.push(format!("scale={}", resize));
    }
    if let Some(subtitles) = &options.subtitles {
        filters.push(format!("subtitles={}", subtitles));
    }
    if options.reverse {
        filters.push("reverse".to_string());
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}

/// convert: read PPM frames, caption them, write a GIF
pub fn convert_args(options: &NormalizedOptions) -> Vec<String> {
    let mut args: Vec<String> = ["-", "+dither", "-layers", "Optimize"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(text) = &options.text {
        args.extend(
            [
                "-gravity",
                "South",
                "-fill",
                "white",
                "-stroke",
                "black",
                "-strokewidth",
                "1",
                "-pointsize",
                "40",
                "-annotate",
                "+20+20",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(text.clone());
    }

    args.push("gif:-".to_string());

    debug!(stage = %Stage::Convert, ?args, "Computed stage arguments");
    args
}

/// gifsicle: optimize, compress, set timing and looping
pub fn optimize_args(options: &NormalizedOptions) -> Vec<String> {
    let mut args = vec![
        "-O3".to_string(),
        format!("--lossy={}", u64::from(options.compress) * 2),
        format!("--colors={}", options.colors),
        "--delay".to_string(),
        frame_delay(options.fps, options.speed).to_string(),
        "--no-warnings".to_string(),
    ];

    if options.loop_disabled() {
        args.push("--no-loopcount".to_string());
    }

    debug!(stage = %Stage::Optimize, ?args, "Computed stage arguments");
    args
}

/// Inter-frame delay in hundredths of a second: round(100 / fps / speed)
pub fn frame_delay(fps: u32, speed: f64) -> i64 {
    (100.0 / fps as f64 / speed).round() as i64
}
