// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::utils::time;

#[cfg(test)]
mod tests;

/// One of the three external stages of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Temporal extraction and per-frame decode (ffmpeg)
    Extract,
    /// Static per-frame transform into a GIF container (ImageMagick convert)
    Convert,
    /// Temporal re-encode and compression (gifsicle)
    Optimize,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 3] = [Stage::Extract, Stage::Convert, Stage::Optimize];

    /// Program invoked for this stage when nothing else is configured
    pub fn default_program(&self) -> &'static str {
        match self {
            Stage::Extract => "ffmpeg",
            Stage::Convert => "convert",
            Stage::Optimize => "gifsicle",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Convert => "convert",
            Stage::Optimize => "optimize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a stage process terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageExit {
    Success,
    /// Non-zero exit code
    Code(i32),
    /// Killed by a signal or otherwise terminated without a code
    Terminated,
}

impl StageExit {
    pub fn is_success(&self) -> bool {
        matches!(self, StageExit::Success)
    }
}

impl fmt::Display for StageExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageExit::Success => write!(f, "success"),
            StageExit::Code(code) => write!(f, "exit code {}", code),
            StageExit::Terminated => write!(f, "terminated by signal"),
        }
    }
}

/// User-facing time value: a count of seconds or a timecode string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl From<f64> for TimeValue {
    fn from(seconds: f64) -> Self {
        TimeValue::Seconds(seconds)
    }
}

impl From<i32> for TimeValue {
    fn from(seconds: i32) -> Self {
        TimeValue::Seconds(seconds as f64)
    }
}

impl From<u32> for TimeValue {
    fn from(seconds: u32) -> Self {
        TimeValue::Seconds(seconds as f64)
    }
}

impl From<&str> for TimeValue {
    fn from(text: &str) -> Self {
        TimeValue::Text(text.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(text: String) -> Self {
        TimeValue::Text(text)
    }
}

/// Normalized time: milliseconds, or a timecode left for the formatter
///
/// The two representations are kept apart until an argument builder renders
/// them through [`TimePoint::to_fixed_width`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TimePoint {
    Millis(f64),
    Timecode(String),
}

impl TimePoint {
    /// Render as `hh:mm:ss.mmm`, all components present
    pub fn to_fixed_width(&self) -> String {
        match self {
            TimePoint::Millis(ms) => time::format_fixed_width(*ms),
            TimePoint::Timecode(text) => {
                time::format_fixed_width(time::parse_timecode(text).unwrap_or(0.0))
            }
        }
    }
}

/// Raw options record as supplied by a caller
///
/// Every field is optional; [`crate::domain::rules::OptionNormalizer`] fills
/// the gaps from [`Defaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GifOptions {
    /// Output frame rate
    pub fps: Option<u32>,
    /// Playback speed multiplier
    pub speed: Option<f64>,
    /// Palette size handed to gifsicle
    pub colors: Option<u16>,
    /// Lossy-compression budget, doubled for gifsicle
    pub compress: Option<u32>,
    /// Start of the extracted range
    pub from: Option<TimeValue>,
    /// End of the extracted range
    pub to: Option<TimeValue>,
    /// ffmpeg scale expression, e.g. `200:-1`
    pub resize: Option<String>,
    /// Subtitle file burned into the frames
    pub subtitles: Option<String>,
    /// Play the extracted range backwards
    pub reverse: bool,
    /// Caption drawn at the bottom of every frame
    pub text: Option<String>,
    /// Only `Some(false)` disables infinite looping
    #[serde(rename = "loop")]
    pub loop_forever: Option<bool>,
}

impl GifOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn colors(mut self, colors: u16) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn compress(mut self, compress: u32) -> Self {
        self.compress = Some(compress);
        self
    }

    pub fn start(mut self, from: impl Into<TimeValue>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn end(mut self, to: impl Into<TimeValue>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn resize(mut self, resize: impl Into<String>) -> Self {
        self.resize = Some(resize.into());
        self
    }

    pub fn subtitles(mut self, subtitles: impl Into<String>) -> Self {
        self.subtitles = Some(subtitles.into());
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn looping(mut self, loop_forever: bool) -> Self {
        self.loop_forever = Some(loop_forever);
        self
    }
}

/// Default values for omitted options, constructed once per pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub fps: u32,
    pub speed: f64,
    pub colors: u16,
    pub compress: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            fps: 10,
            speed: 1.0,
            colors: 80,
            compress: 40,
        }
    }
}

/// Boxed byte source used for caller input
pub type InputReader = Box<dyn AsyncRead + Send + Unpin>;

/// Where the video comes from: a file ffmpeg opens itself, or a byte stream
pub enum InputSource {
    File(PathBuf),
    Stream(InputReader),
}

impl InputSource {
    /// Wrap any async reader as stream input
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        InputSource::Stream(Box::new(reader))
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            InputSource::File(path) => Some(path),
            InputSource::Stream(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, InputSource::Stream(_))
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::File(path) => f.debug_tuple("File").field(path).finish(),
            InputSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::File(path)
    }
}

impl From<&std::path::Path> for InputSource {
    fn from(path: &std::path::Path) -> Self {
        InputSource::File(path.to_path_buf())
    }
}

impl From<&str> for InputSource {
    fn from(path: &str) -> Self {
        InputSource::File(PathBuf::from(path))
    }
}

impl From<String> for InputSource {
    fn from(path: String) -> Self {
        InputSource::File(PathBuf::from(path))
    }
}

/// Options after defaults and time normalization, read-only from here on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOptions {
    /// Set when ffmpeg reads the file itself; `None` means `pipe:0`
    pub input_path: Option<PathBuf>,
    pub fps: u32,
    pub speed: f64,
    pub colors: u16,
    pub compress: u32,
    pub from: Option<TimePoint>,
    pub to: Option<TimePoint>,
    pub resize: Option<String>,
    pub subtitles: Option<String>,
    pub reverse: bool,
    pub text: Option<String>,
    pub loop_forever: Option<bool>,
}

impl NormalizedOptions {
    /// Whether stage 3 must be told to stop looping
    pub fn loop_disabled(&self) -> bool {
        self.loop_forever == Some(false)
    }
}
