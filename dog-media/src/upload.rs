use bytes::Bytes;
use futures::future::{select, Either};
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::settle::Settle;
use crate::{
    ApiError, ByteStream, MediaApi, MediaError, MediaFile, MediaResult, UploadCallback,
    UploadOptions, UploadResponse, UploadSink, UploadSuccess,
};

/// Upload a whole in-memory file through the provider's streaming primitive.
///
/// Empty buffers are rejected before the provider is contacted.
pub async fn stream_upload<A>(
    api: &A,
    file: &MediaFile,
    options: UploadOptions,
    chunk_size: usize,
) -> MediaResult<UploadSuccess>
where
    A: MediaApi + ?Sized,
{
    if file.is_empty() {
        return Err(MediaError::BufferEmpty);
    }

    let source = buffer_stream(file.buffer.clone(), chunk_size);
    pipe_upload(api, &file.file_name, options, source).await
}

/// Pipe `source` into a provider upload and settle on the first signal.
///
/// A failure on the pipe and the provider's completion callback race; the
/// first one decides the result and the other is ignored.
pub async fn pipe_upload<A>(
    api: &A,
    file_name: &str,
    options: UploadOptions,
    mut source: ByteStream,
) -> MediaResult<UploadSuccess>
where
    A: MediaApi + ?Sized,
{
    let (settle, outcome) = Settle::channel();

    let on_complete = settle.clone();
    let owned_name = file_name.to_string();
    let callback: UploadCallback = Box::new(move |response| {
        let result = completion_result(owned_name, response);
        if !on_complete.settle(result) {
            debug!("Ignoring provider completion for an upload that already settled");
        }
    });

    let mut sink = api.upload_stream(options, callback);
    let mut completion = Box::pin(outcome.wait());

    // stop feeding the sink as soon as the provider has reported
    let early = {
        let drain = drain_into(&mut source, &mut sink);
        futures::pin_mut!(drain);
        match select(drain, completion.as_mut()).await {
            Either::Left((piped, _)) => {
                // settle before the sink is dropped so an aborted pipe can't be reported as complete
                if let Err(err) = piped {
                    if !settle.settle(Err(MediaError::upload_failed(err.to_string()))) {
                        debug!(error = %err, "Ignoring pipe error for an upload that already settled");
                    }
                }
                None
            }
            Either::Right((settled, _)) => {
                debug!("Provider reported before the payload was fully written");
                Some(settled)
            }
        }
    };
    drop(sink);
    drop(settle);

    let settled = match early {
        Some(settled) => settled,
        None => completion.await,
    };
    match settled {
        Some(result) => result,
        None => Err(MediaError::upload_failed(
            "provider released the upload without reporting completion",
        )),
    }
}

async fn drain_into(source: &mut ByteStream, sink: &mut UploadSink) -> Result<(), ApiError> {
    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(|e| ApiError::transport(e.to_string()))?;
        sink.send(chunk).await?;
    }
    sink.close().await
}

/// Split a buffer into a stream of `chunk_size` slices without copying
pub fn buffer_stream(buffer: Bytes, chunk_size: usize) -> ByteStream {
    let chunk_size = chunk_size.max(1);
    let stream = async_stream::stream! {
        let mut offset = 0;
        while offset < buffer.len() {
            let end = (offset + chunk_size).min(buffer.len());
            yield Ok::<Bytes, std::io::Error>(buffer.slice(offset..end));
            offset = end;
        }
    };
    Box::pin(stream)
}

fn completion_result(
    file_name: String,
    response: Result<UploadResponse, ApiError>,
) -> MediaResult<UploadSuccess> {
    let response = response.map_err(|e| MediaError::upload_failed(e.to_string()))?;
    debug!(bytes = ?response.bytes, "Provider reported upload completion");

    let url = response
        .secure_url
        .filter(|url| is_secure_url(url))
        .ok_or(MediaError::NoSecureUrl)?;

    let public_id = response
        .public_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| MediaError::upload_failed("provider response carried no public id"))?;

    Ok(UploadSuccess {
        file_name,
        public_id,
        url,
    })
}

/// Absolute `https` URL with a host
pub fn is_secure_url(candidate: &str) -> bool {
    url::Url::parse(candidate)
        .map(|parsed| parsed.scheme() == "https" && parsed.has_host())
        .unwrap_or(false)
}
