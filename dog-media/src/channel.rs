use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::channel::mpsc;
use futures_util::{ready, Sink, StreamExt};

use crate::{ApiError, UploadSink};

enum Frame {
    Chunk(Bytes),
    End,
}

/// Build an in-process upload pipe for providers that buffer the payload
/// before handing it to their backend.
///
/// Closing the sink marks the payload complete; dropping it without closing
/// makes [`UploadReceiver::collect`] fail.
pub fn upload_channel(buffer: usize) -> (UploadSink, UploadReceiver) {
    let (tx, rx) = mpsc::channel(buffer);
    (
        Box::pin(FrameSink { tx, ended: false }),
        UploadReceiver { rx },
    )
}

struct FrameSink {
    tx: mpsc::Sender<Frame>,
    ended: bool,
}

fn closed(_: mpsc::SendError) -> ApiError {
    ApiError::transport("upload channel closed by provider")
}

impl Sink<Bytes> for FrameSink {
    type Error = ApiError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().tx.poll_ready(cx).map_err(closed)
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        self.get_mut().tx.start_send(Frame::Chunk(item)).map_err(closed)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().tx).poll_flush(cx).map_err(closed)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.get_mut();
        if !this.ended {
            ready!(this.tx.poll_ready(cx)).map_err(closed)?;
            this.tx.start_send(Frame::End).map_err(closed)?;
            this.ended = true;
        }
        Pin::new(&mut this.tx).poll_close(cx).map_err(closed)
    }
}

/// Provider side of [`upload_channel`]
pub struct UploadReceiver {
    rx: mpsc::Receiver<Frame>,
}

impl UploadReceiver {
    /// Drain the pipe into one buffer
    pub async fn collect(mut self) -> Result<Bytes, ApiError> {
        let mut data = BytesMut::new();
        while let Some(frame) = self.rx.next().await {
            match frame {
                Frame::Chunk(chunk) => data.extend_from_slice(&chunk),
                Frame::End => return Ok(data.freeze()),
            }
        }
        Err(ApiError::transport("upload aborted before completion"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;

    #[tokio::test]
    async fn close_completes_the_payload() {
        let (mut sink, receiver) = upload_channel(4);
        let collected = tokio::spawn(receiver.collect());

        sink.send(Bytes::from_static(b"hello ")).await.unwrap();
        sink.send(Bytes::from_static(b"world")).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(collected.await.unwrap().unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn drop_without_close_aborts() {
        let (mut sink, receiver) = upload_channel(4);
        let collected = tokio::spawn(receiver.collect());

        sink.send(Bytes::from_static(b"partial")).await.unwrap();
        drop(sink);

        assert!(collected.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (mut sink, receiver) = upload_channel(1);
        drop(receiver);

        assert!(sink.send(Bytes::from_static(b"x")).await.is_err());
    }
}
