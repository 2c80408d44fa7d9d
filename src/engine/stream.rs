//! The pipeline's single output stream

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::fan_in::FirstError;
use crate::error::{GififyError, GififyResult};
use crate::ports::StageReader;

/// GIF bytes from the last stage, plus the pipeline's one error channel
///
/// Reads yield the optimizer's output in order. The first failure anywhere
/// in the pipeline is returned as a single `Err` whose inner error is a
/// [`GififyError`]; every read after that reports end of stream. A clean end
/// of stream is only reported once all three stages have exited without
/// complaint.
///
/// Dropping the stream terminates any stage still running.
pub struct GifStream {
    output: StageReader,
    first_error: Option<FirstError>,
    cancel: CancellationToken,
    deadline: Option<(Duration, Pin<Box<Sleep>>)>,
    output_done: bool,
    finished: bool,
    bytes: u64,
}

impl GifStream {
    pub(crate) fn new(
        output: StageReader,
        first_error: FirstError,
        cancel: CancellationToken,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            output,
            first_error: Some(first_error),
            cancel,
            deadline: timeout.map(|limit| (limit, Box::pin(tokio::time::sleep(limit)))),
            output_done: false,
            finished: false,
            bytes: 0,
        }
    }

    /// Copy the whole GIF into `writer`, returning the byte count
    pub async fn write_to<W>(mut self, writer: &mut W) -> GififyResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let copied = tokio::io::copy(&mut self, writer)
            .await
            .map_err(GififyError::from_stream_error)?;
        writer.flush().await?;
        Ok(copied)
    }

    /// Collect the whole GIF in memory
    pub async fn into_bytes(mut self) -> GififyResult<Vec<u8>> {
        let mut gif = Vec::new();
        self.read_to_end(&mut gif)
            .await
            .map_err(GififyError::from_stream_error)?;
        Ok(gif)
    }

    /// Bytes handed out so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Poll for the pipeline's outcome: `Some` on failure, `None` once settled cleanly
    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Option<GififyError>> {
        let Some(rx) = self.first_error.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(err)) => {
                self.first_error = None;
                Poll::Ready(Some(err))
            }
            Poll::Ready(Err(_)) => {
                self.first_error = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn fail(&mut self, err: GififyError) -> io::Error {
        self.finished = true;
        self.cancel.cancel();
        io::Error::other(err)
    }
}

impl AsyncRead for GifStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.finished || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if let Poll::Ready(Some(err)) = this.poll_outcome(cx) {
            return Poll::Ready(Err(this.fail(err)));
        }

        if let Some((limit, sleep)) = this.deadline.as_mut() {
            if sleep.as_mut().poll(cx).is_ready() {
                let limit = *limit;
                return Poll::Ready(Err(this.fail(GififyError::Timeout(limit))));
            }
        }

        if !this.output_done {
            let before = buf.filled().len();
            match Pin::new(&mut this.output).poll_read(cx, buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(this.fail(GififyError::Io(e)))),
                Poll::Ready(Ok(())) => {
                    let read = buf.filled().len() - before;
                    if read > 0 {
                        this.bytes += read as u64;
                        return Poll::Ready(Ok(()));
                    }
                    debug!(bytes = this.bytes, "Optimizer output closed, waiting for stages");
                    this.output_done = true;
                }
            }
        }

        // Output is drained; end of stream waits until every stage has settled
        match this.poll_outcome(cx) {
            Poll::Ready(Some(err)) => Poll::Ready(Err(this.fail(err))),
            Poll::Ready(None) => {
                info!(bytes = this.bytes, "Pipeline finished");
                this.finished = true;
                Poll::Ready(Ok(()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for GifStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
