//! Orchestration tests against in-process fake stages

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use gifify::ports::{StageControl, StageLauncher, StageProcess, StageSpec, StageWriter};
use gifify::{GifOptions, GifPipeline, GifStream, GififyError, InputSource, Stage, StageExit};

// Test utilities

/// How a fake stage behaves once started
#[derive(Clone)]
enum Behavior {
    /// Copy stdin to stdout, prefixing nothing
    Passthrough,
    /// Ignore stdin, write these bytes and exit cleanly
    Emit(&'static [u8]),
    /// Wait, then write a diagnostic and keep running
    Diagnose { after: Duration, message: &'static str },
    /// Copy stdin to stdout, then exit with this code
    Exit(i32),
    /// Never finish
    Hang,
    /// Program cannot be started
    FailSpawn,
}

struct FakeLauncher {
    behaviors: HashMap<Stage, Behavior>,
    launched: Mutex<Vec<StageSpec>>,
    killed: Arc<Mutex<Vec<Stage>>>,
}

impl FakeLauncher {
    fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            launched: Mutex::new(Vec::new()),
            killed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with(mut self, stage: Stage, behavior: Behavior) -> Self {
        self.behaviors.insert(stage, behavior);
        self
    }

    fn spec(&self, stage: Stage) -> Option<StageSpec> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .find(|spec| spec.stage == stage)
            .cloned()
    }

    fn killed(&self) -> Vec<Stage> {
        self.killed.lock().unwrap().clone()
    }
}

impl StageLauncher for FakeLauncher {
    fn launch(&self, spec: &StageSpec) -> io::Result<StageProcess> {
        self.launched.lock().unwrap().push(spec.clone());
        let behavior = self
            .behaviors
            .get(&spec.stage)
            .cloned()
            .unwrap_or(Behavior::Passthrough);

        if let Behavior::FailSpawn = behavior {
            return Err(io::Error::new(io::ErrorKind::NotFound, "program not found"));
        }

        let (stdin_writer, stdin_reader) = tokio::io::duplex(1024);
        let (stdout_writer, stdout_reader) = tokio::io::duplex(1024);
        let (stderr_writer, stderr_reader) = tokio::io::duplex(1024);
        let reads_stdin = spec.reads_stdin;

        let task = tokio::spawn(run_behavior(
            behavior,
            reads_stdin,
            stdin_reader,
            stdout_writer,
            stderr_writer,
        ));

        Ok(StageProcess {
            stdin: reads_stdin.then(|| Box::new(stdin_writer) as StageWriter),
            stdout: Box::new(stdout_reader),
            stderr: Box::new(stderr_reader),
            control: Box::new(FakeControl {
                stage: spec.stage,
                task: Some(task),
                killed: Arc::clone(&self.killed),
            }),
        })
    }
}

async fn run_behavior(
    behavior: Behavior,
    reads_stdin: bool,
    mut stdin: DuplexStream,
    mut stdout: DuplexStream,
    mut stderr: DuplexStream,
) -> io::Result<StageExit> {
    match behavior {
        Behavior::Passthrough => {
            if reads_stdin {
                tokio::io::copy(&mut stdin, &mut stdout).await?;
            }
            Ok(StageExit::Success)
        }
        Behavior::Emit(bytes) => {
            stdout.write_all(bytes).await?;
            Ok(StageExit::Success)
        }
        Behavior::Diagnose { after, message } => {
            tokio::time::sleep(after).await;
            stderr.write_all(message.as_bytes()).await?;
            std::future::pending::<io::Result<StageExit>>().await
        }
        Behavior::Exit(code) => {
            tokio::io::copy(&mut stdin, &mut stdout).await?;
            Ok(StageExit::Code(code))
        }
        Behavior::Hang | Behavior::FailSpawn => std::future::pending().await,
    }
}

struct FakeControl {
    stage: Stage,
    task: Option<JoinHandle<io::Result<StageExit>>>,
    killed: Arc<Mutex<Vec<Stage>>>,
}

#[async_trait]
impl StageControl for FakeControl {
    async fn wait(&mut self) -> io::Result<StageExit> {
        match self.task.as_mut() {
            Some(task) => {
                let exit = match task.await {
                    Ok(result) => result,
                    Err(_) => Ok(StageExit::Terminated),
                };
                self.task = None;
                exit
            }
            None => Ok(StageExit::Terminated),
        }
    }

    async fn kill(&mut self) -> io::Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            self.killed.lock().unwrap().push(self.stage);
        }
        Ok(())
    }
}

/// Read a stream to its end, collecting bytes and every error event
async fn drain(mut stream: GifStream) -> (Vec<u8>, Vec<GififyError>) {
    let mut bytes = Vec::new();
    let mut errors = Vec::new();
    let mut buf = [0u8; 256];

    // A bounded number of reads keeps a broken stream from looping forever
    for _ in 0..10_000 {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => bytes.extend_from_slice(&buf[..n]),
            Err(e) => errors.push(GififyError::from_stream_error(e)),
        }
    }
    (bytes, errors)
}

fn pipeline(launcher: &Arc<FakeLauncher>) -> GifPipeline {
    GifPipeline::new(Arc::clone(launcher) as Arc<dyn StageLauncher>)
}

// Wiring

#[tokio::test]
async fn test_stream_input_flows_through_all_stages_in_order() {
    let launcher = Arc::new(FakeLauncher::new());
    let input: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();

    let stream = pipeline(&launcher).run(
        InputSource::stream(std::io::Cursor::new(input.clone())),
        GifOptions::new(),
    );
    let (bytes, errors) = drain(stream).await;

    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(bytes, input);
}

#[tokio::test]
async fn test_each_stage_receives_its_arguments() {
    let launcher = Arc::new(FakeLauncher::new());
    let stream = pipeline(&launcher).run(
        InputSource::stream(tokio::io::empty()),
        GifOptions::new().fps(25).speed(2.0).text("hi").looping(false),
    );
    drain(stream).await;

    let extract = launcher.spec(Stage::Extract).unwrap();
    assert!(extract.reads_stdin);
    assert!(extract.args.contains(&"pipe:0".to_string()));
    assert!(extract.args.contains(&"25".to_string()));

    let convert = launcher.spec(Stage::Convert).unwrap();
    assert!(convert.args.contains(&"hi".to_string()));

    let optimize = launcher.spec(Stage::Optimize).unwrap();
    assert_eq!(optimize.args[3..5], ["--delay".to_string(), "2".to_string()]);
    assert_eq!(optimize.args.last().map(String::as_str), Some("--no-loopcount"));
}

#[tokio::test]
async fn test_file_input_leaves_stdin_unconnected() {
    let launcher = Arc::new(
        FakeLauncher::new().with(Stage::Extract, Behavior::Emit(b"P6 frames")),
    );

    let stream = pipeline(&launcher).run("movie.mp4", GifOptions::new());
    let (bytes, errors) = drain(stream).await;

    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(bytes, b"P6 frames");

    let extract = launcher.spec(Stage::Extract).unwrap();
    assert!(!extract.reads_stdin);
    assert!(extract.args.contains(&"movie.mp4".to_string()));
    assert!(!extract.args.contains(&"pipe:0".to_string()));
}

#[tokio::test]
async fn test_output_is_returned_before_any_byte_exists() {
    let launcher = Arc::new(FakeLauncher::new().with(Stage::Extract, Behavior::Hang));
    let (_writer, reader) = tokio::io::duplex(16);

    // run() must not wait on the stages
    let stream = pipeline(&launcher).run(InputSource::stream(reader), GifOptions::new());
    assert_eq!(stream.bytes_read(), 0);
    drop(stream);
}

// Error fan-in

#[tokio::test]
async fn test_diagnostic_output_is_a_single_error() {
    let launcher = Arc::new(FakeLauncher::new().with(
        Stage::Convert,
        Behavior::Diagnose {
            after: Duration::ZERO,
            message: "convert: no images defined `gif:-'\n",
        },
    ));

    let stream = pipeline(&launcher).run("movie.mp4", GifOptions::new());
    let (_bytes, errors) = drain(stream).await;

    assert_eq!(errors.len(), 1);
    match &errors[0] {
        GififyError::StageDiagnostic { stage, message } => {
            assert_eq!(*stage, Stage::Convert);
            assert_eq!(message, "convert: no images defined `gif:-'");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_first_diagnostic_wins() {
    let launcher = Arc::new(
        FakeLauncher::new()
            .with(
                Stage::Extract,
                Behavior::Diagnose {
                    after: Duration::from_millis(300),
                    message: "late",
                },
            )
            .with(
                Stage::Optimize,
                Behavior::Diagnose {
                    after: Duration::ZERO,
                    message: "early",
                },
            ),
    );

    let stream = pipeline(&launcher).run("movie.mp4", GifOptions::new());
    let (_bytes, errors) = drain(stream).await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage(), Some(Stage::Optimize));
}

#[tokio::test]
async fn test_first_error_terminates_sibling_stages() {
    let launcher = Arc::new(
        FakeLauncher::new()
            .with(Stage::Extract, Behavior::Hang)
            .with(
                Stage::Optimize,
                Behavior::Diagnose {
                    after: Duration::from_millis(10),
                    message: "gifsicle: broken",
                },
            ),
    );

    let stream = pipeline(&launcher).run("movie.mp4", GifOptions::new());
    let (_bytes, errors) = drain(stream).await;
    assert_eq!(errors.len(), 1);

    // Watchers terminate their stages once the pipeline is cancelled
    for _ in 0..100 {
        if launcher.killed().len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let killed = launcher.killed();
    assert!(killed.contains(&Stage::Extract), "killed: {killed:?}");
    assert!(killed.contains(&Stage::Optimize), "killed: {killed:?}");
}

#[tokio::test]
async fn test_spawn_failure_surfaces_on_stream() {
    let launcher = Arc::new(FakeLauncher::new().with(Stage::Optimize, Behavior::FailSpawn));

    let stream = pipeline(&launcher).run("movie.mp4", GifOptions::new());
    let (bytes, errors) = drain(stream).await;

    assert!(bytes.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        GififyError::SpawnFailure { stage: Stage::Optimize, .. }
    ));
}

#[tokio::test]
async fn test_abnormal_exit_without_diagnostics_fails() {
    let launcher = Arc::new(FakeLauncher::new().with(Stage::Convert, Behavior::Exit(1)));

    let stream = pipeline(&launcher).run(
        InputSource::stream(&b"frames"[..]),
        GifOptions::new(),
    );
    let (_bytes, errors) = drain(stream).await;

    assert_eq!(errors.len(), 1);
    match &errors[0] {
        GififyError::StageExited { stage, exit } => {
            assert_eq!(*stage, Stage::Convert);
            assert_eq!(*exit, StageExit::Code(1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_stdin_closure_by_extract_is_not_an_error() {
    // Extract stops reading and exits while input keeps coming
    let launcher = Arc::new(FakeLauncher::new().with(Stage::Extract, Behavior::Emit(b"GIF89a")));

    let stream = pipeline(&launcher).run(
        InputSource::stream(tokio::io::repeat(7)),
        GifOptions::new(),
    );
    let (bytes, errors) = drain(stream).await;

    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(bytes, b"GIF89a");
}

#[tokio::test]
async fn test_input_read_error_is_reported() {
    struct FailingReader;

    impl tokio::io::AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    let launcher = Arc::new(FakeLauncher::new());
    let stream = pipeline(&launcher).run(InputSource::stream(FailingReader), GifOptions::new());
    let (_bytes, errors) = drain(stream).await;

    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], GififyError::Input(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
}

#[tokio::test]
async fn test_timeout_aborts_hung_pipeline() {
    let launcher = Arc::new(FakeLauncher::new().with(Stage::Extract, Behavior::Hang));

    let stream = pipeline(&launcher)
        .with_timeout(Duration::from_millis(50))
        .run("movie.mp4", GifOptions::new());
    let (bytes, errors) = drain(stream).await;

    assert!(bytes.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], GififyError::Timeout(_)));
}

#[tokio::test]
async fn test_into_bytes_returns_pipeline_error() {
    let launcher = Arc::new(FakeLauncher::new().with(Stage::Extract, Behavior::FailSpawn));

    let err = pipeline(&launcher)
        .run("movie.mp4", GifOptions::new())
        .into_bytes()
        .await
        .unwrap_err();

    assert!(matches!(err, GififyError::SpawnFailure { stage: Stage::Extract, .. }));
}
