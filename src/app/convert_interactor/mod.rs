// Convert interactor - Orchestrates the video to GIF use case

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::model::{GifOptions, InputSource};
use crate::engine::{GifPipeline, PipelinePlan};

/// Input or output name meaning the standard stream
pub const STD_STREAM: &str = "-";

/// Request for one conversion
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Video file path, or `-` for standard input
    pub input: String,
    /// GIF path; `None` or `-` writes standard output
    pub output: Option<PathBuf>,
    pub options: GifOptions,
    /// Overrides the configured timeout
    pub timeout: Option<Duration>,
}

/// Outcome of a finished conversion
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub bytes: u64,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Interactor for the convert use case
pub struct ConvertInteractor {
    pipeline: GifPipeline,
}

impl ConvertInteractor {
    pub fn new(pipeline: GifPipeline) -> Self {
        Self { pipeline }
    }

    /// Argument vectors the conversion would use
    pub fn plan(&self, input: &str, options: GifOptions) -> PipelinePlan {
        self.pipeline.plan(&input_source(input), options)
    }

    /// Run one conversion to completion
    pub async fn execute(&self, request: ConvertRequest) -> Result<ConvertReport> {
        let started = Instant::now();
        let pipeline = match request.timeout {
            Some(timeout) => self.pipeline.clone().with_timeout(timeout),
            None => self.pipeline.clone(),
        };

        let output = request
            .output
            .filter(|path| path.as_os_str() != STD_STREAM);

        info!(input = %request.input, output = ?output, "Converting video to GIF");
        let stream = pipeline.run(input_source(&request.input), request.options);

        let bytes = match &output {
            Some(path) => write_atomically(stream, path).await?,
            None => {
                let mut stdout = tokio::io::stdout();
                stream
                    .write_to(&mut stdout)
                    .await
                    .context("Failed to convert video")?
            }
        };

        let report = ConvertReport {
            bytes,
            output,
            elapsed: started.elapsed(),
        };
        info!(
            bytes = report.bytes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Conversion completed"
        );
        Ok(report)
    }
}

fn input_source(input: &str) -> InputSource {
    if input == STD_STREAM {
        InputSource::stream(tokio::io::stdin())
    } else {
        InputSource::from(input)
    }
}

/// Write into a temporary sibling file and rename it into place on success
async fn write_atomically(stream: crate::engine::GifStream, path: &Path) -> Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let temp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    let mut file = tokio::fs::File::from_std(temp.reopen()?);

    let bytes = stream
        .write_to(&mut file)
        .await
        .context("Failed to convert video")?;
    file.sync_all().await?;
    drop(file);

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    Ok(bytes)
}
