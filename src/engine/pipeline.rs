//! Pipeline orchestration
//!
//! Starts the three stages, links their standard channels into one chain and
//! hands the last stage's output back as a [`GifStream`]. Each stage gets a
//! watcher task for its diagnostic channel and exit status; each link gets a
//! pump task. All of them report into one [`ErrorFanIn`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::domain::model::{Defaults, GifOptions, InputSource, Stage, StageExit};
use crate::domain::rules::OptionNormalizer;
use crate::engine::args::PipelinePlan;
use crate::engine::fan_in::ErrorFanIn;
use crate::engine::stream::GifStream;
use crate::error::GififyError;
use crate::ports::*;

const PUMP_BUFFER: usize = 64 * 1024;
const DIAGNOSTIC_BUFFER: usize = 8 * 1024;

/// Per-pipeline settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSettings {
    /// Values for omitted options
    pub defaults: Defaults,
    /// Fail the pipeline if it has not settled after this long
    pub timeout: Option<Duration>,
}

/// Video to GIF pipeline over a stage launcher
#[derive(Clone)]
pub struct GifPipeline {
    launcher: Arc<dyn StageLauncher>,
    settings: PipelineSettings,
}

impl GifPipeline {
    /// Create a pipeline with default settings
    pub fn new(launcher: Arc<dyn StageLauncher>) -> Self {
        Self {
            launcher,
            settings: PipelineSettings::default(),
        }
    }

    /// Replace all settings
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the default option values
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.settings.defaults = defaults;
        self
    }

    /// Abort pipelines that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = Some(timeout);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Compute the argument vectors without starting anything
    pub fn plan(&self, input: &InputSource, options: GifOptions) -> PipelinePlan {
        let normalized = OptionNormalizer::new(&self.settings.defaults).normalize(input, options);
        PipelinePlan::build(&normalized)
    }

    /// Start converting `input` and return the GIF stream right away
    ///
    /// Nothing here blocks: failures, including a stage that cannot be
    /// started, surface as the stream's error. Must be called from within a
    /// Tokio runtime.
    pub fn run(&self, input: impl Into<InputSource>, options: GifOptions) -> GifStream {
        let input = input.into();
        let plan = self.plan(&input, options);

        info!(
            input = ?input,
            timeout = ?self.settings.timeout,
            "Starting gif pipeline"
        );

        let cancel = CancellationToken::new();
        let (fan_in, first_error) = ErrorFanIn::new(cancel.clone());

        let mut extract = self.start_stage(Stage::Extract, &plan, input.is_stream(), &fan_in);
        let mut convert = self.start_stage(Stage::Convert, &plan, true, &fan_in);
        let mut optimize = self.start_stage(Stage::Optimize, &plan, true, &fan_in);

        if let (InputSource::Stream(reader), Some(stage)) = (input, extract.as_mut()) {
            if let Some(writer) = stage.stdin.take() {
                spawn_link(Link::Input, reader, writer, stage.exited.clone(), &fan_in);
            }
        }
        connect(Link::ExtractToConvert, &mut extract, &mut convert, &fan_in);
        connect(Link::ConvertToOptimize, &mut convert, &mut optimize, &fan_in);

        let output = optimize
            .and_then(|mut s| s.stdout.take())
            .unwrap_or_else(|| Box::new(tokio::io::empty()));

        GifStream::new(output, first_error, cancel, self.settings.timeout)
    }

    fn start_stage(
        &self,
        stage: Stage,
        plan: &PipelinePlan,
        reads_stdin: bool,
        fan_in: &ErrorFanIn,
    ) -> Option<StageIo> {
        let spec = StageSpec {
            stage,
            args: plan.args(stage).to_vec(),
            reads_stdin,
        };

        let process = match self.launcher.launch(&spec) {
            Ok(process) => process,
            Err(source) => {
                fan_in.report(GififyError::SpawnFailure { stage, source });
                return None;
            }
        };

        let exited = CancellationToken::new();
        tokio::spawn(watch_stage(
            stage,
            process.stderr,
            process.control,
            fan_in.clone(),
            exited.clone(),
        ));

        Some(StageIo {
            stdin: process.stdin,
            stdout: Some(process.stdout),
            exited,
        })
    }
}

/// Channels of a started stage that still need wiring
struct StageIo {
    stdin: Option<StageWriter>,
    stdout: Option<StageReader>,
    /// Cancelled once the stage process has terminated
    exited: CancellationToken,
}

/// A byte link between two ends of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Input,
    ExtractToConvert,
    ConvertToOptimize,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Input => write!(f, "input -> extract"),
            Link::ExtractToConvert => write!(f, "extract -> convert"),
            Link::ConvertToOptimize => write!(f, "convert -> optimize"),
        }
    }
}

fn connect(
    link: Link,
    upstream: &mut Option<StageIo>,
    downstream: &mut Option<StageIo>,
    fan_in: &ErrorFanIn,
) {
    let (Some(up), Some(down)) = (upstream.as_mut(), downstream.as_mut()) else {
        return;
    };
    if let (Some(reader), Some(writer)) = (up.stdout.take(), down.stdin.take()) {
        spawn_link(link, reader, writer, down.exited.clone(), fan_in);
    }
}

fn spawn_link(
    link: Link,
    reader: StageReader,
    writer: StageWriter,
    downstream_exited: CancellationToken,
    fan_in: &ErrorFanIn,
) {
    let fan_in = fan_in.clone();
    tokio::spawn(async move {
        let cancel = fan_in.cancellation().clone();
        let result = tokio::select! {
            result = pump(reader, writer) => result,
            _ = downstream_exited.cancelled() => {
                trace!(%link, "Downstream stage exited, closing link");
                return;
            }
            _ = cancel.cancelled() => return,
        };

        match result {
            Ok(bytes) => debug!(%link, bytes, "Link finished"),
            Err(PumpError::Read(e)) if link == Link::Input => {
                fan_in.report(GififyError::Input(e));
            }
            Err(PumpError::Read(e)) => {
                fan_in.report(GififyError::Io(e));
            }
            // ffmpeg may close stdin while input is still arriving
            Err(PumpError::Write(e)) if link == Link::Input => {
                debug!(%link, error = %e, "Ignoring stdin closure");
            }
            // The downstream stage reports its own failure
            Err(PumpError::Write(e)) => {
                debug!(%link, error = %e, "Downstream closed early");
            }
        }
    });
}

enum PumpError {
    Read(std::io::Error),
    Write(std::io::Error),
}

/// Copy until end of stream, then close the writer
async fn pump(mut reader: StageReader, mut writer: StageWriter) -> Result<u64, PumpError> {
    let mut buf = vec![0u8; PUMP_BUFFER];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await.map_err(PumpError::Read)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await.map_err(PumpError::Write)?;
        total += n as u64;
    }

    writer.shutdown().await.map_err(PumpError::Write)?;
    Ok(total)
}

/// Watch one stage: any diagnostic output or abnormal exit is a failure
async fn watch_stage(
    stage: Stage,
    mut stderr: StageReader,
    mut control: Box<dyn StageControl>,
    fan_in: ErrorFanIn,
    exited: CancellationToken,
) {
    let cancel = fan_in.cancellation().clone();

    let diagnostic = tokio::select! {
        diagnostic = read_diagnostic(&mut stderr) => diagnostic,
        _ = cancel.cancelled() => {
            terminate(stage, control.as_mut()).await;
            exited.cancel();
            return;
        }
    };

    match diagnostic {
        Ok(Some(message)) => {
            fan_in.report(GififyError::StageDiagnostic { stage, message });
            terminate(stage, control.as_mut()).await;
            exited.cancel();
            return;
        }
        Ok(None) => trace!(%stage, "Diagnostic channel closed"),
        Err(e) => debug!(%stage, error = %e, "Failed to read diagnostic channel"),
    }

    let status = tokio::select! {
        status = control.wait() => status,
        _ = cancel.cancelled() => {
            terminate(stage, control.as_mut()).await;
            exited.cancel();
            return;
        }
    };

    match status {
        Ok(StageExit::Success) => debug!(%stage, "Stage exited"),
        Ok(exit) => {
            fan_in.report(GififyError::StageExited { stage, exit });
        }
        Err(e) => {
            fan_in.report(GififyError::Io(e));
        }
    }
    exited.cancel();
}

/// First chunk written to a diagnostic channel, or `None` at end of stream
async fn read_diagnostic(stderr: &mut StageReader) -> std::io::Result<Option<String>> {
    let mut buf = vec![0u8; DIAGNOSTIC_BUFFER];
    let n = stderr.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf[..n]).trim().to_string()))
}

async fn terminate(stage: Stage, control: &mut dyn StageControl) {
    match control.kill().await {
        Ok(()) => debug!(%stage, "Stage terminated"),
        Err(e) => debug!(%stage, error = %e, "Failed to terminate stage"),
    }
}
