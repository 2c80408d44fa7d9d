//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::model::{GifOptions, TimeValue};

/// Options shared by every command that describes a conversion
#[derive(Args, Debug, Clone)]
pub struct GifArgs {
    /// Input video file path, or `-` for standard input
    pub input: String,

    /// Output frame rate [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    /// Playback speed multiplier [default: 1]
    #[arg(long, value_parser = parse_speed)]
    pub speed: Option<f64>,

    /// Number of colors in the palette, 1-256 [default: 80]
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub colors: Option<u16>,

    /// Lossy compression budget, 0 disables [default: 40]
    #[arg(long)]
    pub compress: Option<u32>,

    /// Start time (seconds or HH:MM:SS.ms)
    #[arg(long, allow_hyphen_values = true)]
    pub from: Option<String>,

    /// End time (seconds or HH:MM:SS.ms)
    #[arg(long, allow_hyphen_values = true)]
    pub to: Option<String>,

    /// Resize filter in ffmpeg scale syntax, e.g. 200:-1
    #[arg(long, allow_hyphen_values = true)]
    pub resize: Option<String>,

    /// Subtitle file to burn into the frames
    #[arg(long)]
    pub subtitles: Option<String>,

    /// Play the video backwards
    #[arg(long)]
    pub reverse: bool,

    /// Caption drawn at the bottom of every frame
    #[arg(long)]
    pub text: Option<String>,

    /// Play the GIF once instead of looping forever
    #[arg(long)]
    pub no_loop: bool,
}

impl GifArgs {
    /// Raw options for the pipeline
    pub fn to_options(&self) -> GifOptions {
        GifOptions {
            fps: self.fps,
            speed: self.speed,
            colors: self.colors,
            compress: self.compress,
            from: self.from.clone().map(TimeValue::Text),
            to: self.to.clone().map(TimeValue::Text),
            resize: self.resize.clone(),
            subtitles: self.subtitles.clone(),
            reverse: self.reverse,
            text: self.text.clone(),
            loop_forever: if self.no_loop { Some(false) } else { None },
        }
    }
}

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub gif: GifArgs,

    /// Output GIF path, `-` or omitted for standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Abort after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub gif: GifArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err("speed must be a positive number".to_string())
    }
}
