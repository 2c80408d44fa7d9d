// Ports - Interface definitions (contracts)
//
// The pipeline only ever talks to its stages through these traits, so the
// orchestration can run against in-process fakes as well as real programs.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::model::{Stage, StageExit};

/// Boxed readable end of a stage channel
pub type StageReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed writable end of a stage channel
pub type StageWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// What the pipeline asks a launcher to start
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub stage: Stage,
    pub args: Vec<String>,
    /// Whether the stage reads its standard input
    pub reads_stdin: bool,
}

/// A running stage: its three channels plus a control handle
pub struct StageProcess {
    /// Present when `reads_stdin` was requested
    pub stdin: Option<StageWriter>,
    pub stdout: StageReader,
    /// Diagnostic channel; any byte on it counts as failure
    pub stderr: StageReader,
    pub control: Box<dyn StageControl>,
}

/// Port for starting stage processes
pub trait StageLauncher: Send + Sync {
    /// Start the stage described by `spec`
    ///
    /// Errors mean the program could not be started at all.
    fn launch(&self, spec: &StageSpec) -> io::Result<StageProcess>;
}

/// Port for observing and terminating a started stage
#[async_trait]
pub trait StageControl: Send {
    /// Wait for the stage to terminate
    async fn wait(&mut self) -> io::Result<StageExit>;

    /// Terminate the stage and reap it
    async fn kill(&mut self) -> io::Result<()>;
}
