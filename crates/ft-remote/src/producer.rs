//! Tail producer loop
//!
//! Streams the files named by a `TailRequest` as framed `Message`s to an
//! output sink, one path at a time in request order. A missing or
//! non-regular path is reported as `Skipped` and does not stop the
//! remaining paths; an I/O error on an opened file is reported as
//! `Fatal` and terminates the producer.

use std::io::ErrorKind;
use std::path::Path;

use futures::SinkExt;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWrite, BufReader};
use tokio_util::codec::FramedWrite;

use ft_protocol::{LineRecord, Message, MessageCodec, ProtocolError, SkipReason, TailRequest};

/// Errors that terminate the producer
#[derive(Error, Debug)]
pub enum ProducerError {
    /// I/O error on a tailed file
    #[error("Tail I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The outbound stream failed or closed
    #[error("Outbound stream error: {0}")]
    Stream(#[from] ProtocolError),
}

/// Stream every path of the request to `out`, in order.
///
/// Returns once the last path reaches end-of-file (non-follow mode) or
/// when the producer is terminated by a file error or by the outbound
/// stream closing. In follow mode the first path is polled for new data
/// indefinitely; termination comes from the transport severing stdio.
pub async fn stream_paths<W>(request: &TailRequest, out: W) -> Result<(), ProducerError>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(out, MessageCodec::new());

    for path in &request.paths {
        match probe_path(path).await {
            Ok(Some(reason)) => {
                tracing::warn!(path = %path.display(), %reason, "Skipping path");
                framed
                    .send(Message::Skipped {
                        path: path.clone(),
                        reason,
                    })
                    .await?;
                continue;
            }
            Ok(None) => {}
            Err(e) => return fail(&mut framed, path, e).await,
        }

        if let Err(e) = tail_path(&mut framed, path, request).await {
            return match e {
                // File errors get a structured Fatal record before we
                // terminate; stream errors mean nobody is listening
                ProducerError::Io(io_err) => fail(&mut framed, path, io_err).await,
                other => Err(other),
            };
        }
    }

    Ok(())
}

/// Check whether a path should be skipped.
///
/// Returns `Some(reason)` when the path is missing or not a regular
/// file, `None` when it is tailable.
async fn probe_path(path: &Path) -> Result<Option<SkipReason>, std::io::Error> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(None),
        Ok(_) => Ok(Some(SkipReason::NotRegular)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Some(SkipReason::NotFound)),
        Err(e) => Err(e),
    }
}

/// Report a fatal file error and terminate
async fn fail<W>(
    framed: &mut FramedWrite<W, MessageCodec>,
    path: &Path,
    error: std::io::Error,
) -> Result<(), ProducerError>
where
    W: AsyncWrite + Unpin,
{
    tracing::error!(path = %path.display(), %error, "Tail terminated");
    let message = format!("{}: {}", path.display(), error);
    // Best effort: the stream itself may already be gone
    let _ = framed.send(Message::Fatal { message }).await;
    Err(ProducerError::Io(error))
}

/// Follow one file, emitting a `Line` frame per complete line
async fn tail_path<W>(
    framed: &mut FramedWrite<W, MessageCodec>,
    path: &Path,
    request: &TailRequest,
) -> Result<(), ProducerError>
where
    W: AsyncWrite + Unpin,
{
    tracing::debug!(
        path = %path.display(),
        offset = request.seek_offset,
        whence = ?request.seek_whence,
        "Opening path"
    );

    let mut file = File::open(path).await?;
    file.seek(request.seek_from()).await?;
    let mut reader = BufReader::new(file);

    // Bytes read past the last newline. A line that straddles an
    // end-of-file probe is held here until its terminator arrives, so
    // consumers never see a record split mid-line.
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let mut chunk = Vec::new();
        let n = reader.read_until(b'\n', &mut chunk).await?;

        if n == 0 {
            if request.follow {
                tokio::time::sleep(request.poll_interval()).await;
                continue;
            }
            // Trailing line without a terminator still gets emitted
            // when we stop at end-of-file
            if !pending.is_empty() {
                let record = LineRecord::new(path, std::mem::take(&mut pending));
                framed.send(Message::Line(record)).await?;
            }
            return Ok(());
        }

        pending.extend_from_slice(&chunk);
        if pending.ends_with(b"\n") {
            let record = LineRecord::new(path, std::mem::take(&mut pending));
            framed.send(Message::Line(record)).await?;
        }
    }
}
