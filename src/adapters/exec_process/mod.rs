//! Process execution adapter
//!
//! Starts the ffmpeg, convert and gifsicle programs as child processes with
//! piped standard channels.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::domain::model::{Stage, StageExit};
use crate::ports::*;

/// Program names or paths for each stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePrograms {
    pub ffmpeg: String,
    pub convert: String,
    pub gifsicle: String,
}

impl Default for StagePrograms {
    fn default() -> Self {
        Self {
            ffmpeg: Stage::Extract.default_program().to_string(),
            convert: Stage::Convert.default_program().to_string(),
            gifsicle: Stage::Optimize.default_program().to_string(),
        }
    }
}

impl StagePrograms {
    /// Program configured for a stage
    pub fn program(&self, stage: Stage) -> &str {
        match stage {
            Stage::Extract => &self.ffmpeg,
            Stage::Convert => &self.convert,
            Stage::Optimize => &self.gifsicle,
        }
    }

    /// Check whether every configured program can be started
    pub fn all_available(&self) -> bool {
        Stage::ALL.iter().all(|stage| {
            let program = self.program(*stage);
            let probe = match stage {
                Stage::Extract => "-version",
                Stage::Convert | Stage::Optimize => "--version",
            };
            std::process::Command::new(program)
                .arg(probe)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }
}

/// Child-process launcher
pub struct ProcessLauncher {
    programs: StagePrograms,
}

impl ProcessLauncher {
    /// Create launcher for the given programs
    pub fn new(programs: StagePrograms) -> Self {
        Self { programs }
    }

    pub fn programs(&self) -> &StagePrograms {
        &self.programs
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new(StagePrograms::default())
    }
}

impl StageLauncher for ProcessLauncher {
    fn launch(&self, spec: &StageSpec) -> io::Result<StageProcess> {
        let program = self.programs.program(spec.stage);

        let mut cmd = Command::new(program);
        cmd.args(&spec.args)
            .stdin(if spec.reads_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", program, e)))?;
        debug!(stage = %spec.stage, program, pid = ?child.id(), "Spawned stage");

        let stdin = child
            .stdin
            .take()
            .map(|stdin| Box::new(stdin) as StageWriter);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stage stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stage stderr was not captured"))?;

        Ok(StageProcess {
            stdin,
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            control: Box::new(ChildControl { child }),
        })
    }
}

/// Control handle over a spawned child
struct ChildControl {
    child: Child,
}

#[async_trait]
impl StageControl for ChildControl {
    async fn wait(&mut self) -> io::Result<StageExit> {
        let status = self.child.wait().await?;
        Ok(if status.success() {
            StageExit::Success
        } else {
            match status.code() {
                Some(code) => StageExit::Code(code),
                None => StageExit::Terminated,
            }
        })
    }

    async fn kill(&mut self) -> io::Result<()> {
        match self.child.kill().await {
            // Already reaped
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}
