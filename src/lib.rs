//! Gifify Library
//!
//! Converts a video, given as a file path or a byte stream, into an optimized
//! animated GIF by chaining three external programs:
//!
//! 1. `ffmpeg` extracts the requested range and decodes it to PPM frames
//! 2. `convert` (ImageMagick) turns the frames into a GIF, optionally captioned
//! 3. `gifsicle` optimizes, compresses and sets frame timing
//!
//! ```no_run
//! use gifify::{gifify, GifOptions};
//!
//! # async fn demo() -> gifify::GififyResult<()> {
//! let options = GifOptions::new().start(30).end(35).resize("200:-1");
//! let mut out = tokio::fs::File::create("movie.gif").await?;
//! gifify("movie.mp4", options).write_to(&mut out).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use adapters::{GififyConfig, ProcessLauncher, StagePrograms};
pub use domain::model::{Defaults, GifOptions, InputSource, Stage, StageExit, TimeValue};
pub use engine::{GifPipeline, GifStream, PipelinePlan, PipelineSettings};
pub use error::{GififyError, GififyResult};

/// Convert `input` with the stage programs found on `PATH`
///
/// Shorthand for a [`GifPipeline`] over a default [`ProcessLauncher`]. Must be
/// called from within a Tokio runtime.
pub fn gifify(input: impl Into<InputSource>, options: GifOptions) -> GifStream {
    GifPipeline::new(Arc::new(ProcessLauncher::default())).run(input, options)
}
