//! Upload operations for the drive API
//!
//! The gateway understands exactly two upload shapes:
//! - [`upload_multipart`] - one-shot multipart upload of a complete object
//! - [`create_upload_session`] + [`upload_resumable`] - a resumable
//!   session: an init request that yields a session id, then a single
//!   long-lived multipart request whose body is streamed chunk by chunk
//!   from a channel
//!
//! Both shapes answer with the plain-text identifier of the stored
//! object; callers re-fetch canonical metadata by that id.

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Body, Method,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::DriveClient;

/// Request header carrying the declared content length of a resumable
/// upload on the init request.
pub const CONTENT_LENGTH_HEADER: &str = "X-Content-Length";

/// Response header carrying the upload-session identifier returned by the
/// init request.
pub const UPLOAD_ID_HEADER: &str = "X-Uploadid";

/// Request header carrying the byte range of the streamed request body.
pub const CONTENT_RANGE_HEADER: &str = "Content-Range";

/// JSON body of the resumable upload init request.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadInitBody<'a> {
    title: &'a str,
    mime_type: &'a str,
}

/// Builds the single `file` form field both upload shapes use.
fn file_part(name: &str, content_type: &str, body: impl Into<Body>) -> Result<Part> {
    Part::stream(body)
        .file_name(name.to_string())
        .mime_str(content_type)
        .with_context(|| format!("Invalid content type {content_type:?}"))
}

/// Uploads a complete object in one multipart request.
///
/// `POST /api/upload?uploadType=multipart` with a form carrying a single
/// `file` field. The response body is the plain-text object id.
///
/// # Arguments
/// * `client` - The authenticated client
/// * `name` - Object name (used as the form field's file name)
/// * `content_type` - MIME type of the content
/// * `data` - Complete object content
///
/// # Returns
/// The identifier of the stored object.
pub async fn upload_multipart(
    client: &DriveClient,
    name: &str,
    content_type: &str,
    data: Vec<u8>,
) -> Result<String> {
    debug!(name, len = data.len(), "Starting simple upload");

    let form = Form::new().part("file", file_part(name, content_type, data)?);

    let id = client
        .request(Method::POST, "/api/upload")
        .query(&[("uploadType", "multipart")])
        .multipart(form)
        .send()
        .await
        .context("Failed to send simple upload request")?
        .error_for_status()
        .context("Simple upload returned error status")?
        .text()
        .await
        .context("Failed to read simple upload response body")?;

    debug!(name, %id, "Simple upload complete");
    Ok(id)
}

/// Creates a resumable upload session.
///
/// `POST /api/upload` with a JSON body naming the object and its MIME
/// type, and the declared total length in the
/// [`CONTENT_LENGTH_HEADER`] header. The session id comes back in the
/// [`UPLOAD_ID_HEADER`] response header.
///
/// # Returns
/// The upload-session identifier to pass to [`upload_resumable`].
pub async fn create_upload_session(
    client: &DriveClient,
    name: &str,
    content_type: &str,
    total: u64,
) -> Result<String> {
    debug!(name, total, "Creating upload session");

    let body = UploadInitBody {
        title: name,
        mime_type: content_type,
    };

    let response = client
        .request(Method::POST, "/api/upload")
        .header(CONTENT_LENGTH_HEADER, total.to_string())
        .json(&body)
        .send()
        .await
        .context("Failed to send upload init request")?
        .error_for_status()
        .context("Upload init returned error status")?;

    let upload_id = response
        .headers()
        .get(UPLOAD_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .with_context(|| format!("Upload init response missing {UPLOAD_ID_HEADER} header"))?;

    debug!(name, %upload_id, "Upload session created");
    Ok(upload_id)
}

/// Streams a resumable upload over a single multipart request.
///
/// The request body is a multipart form whose `file` field is fed from
/// `chunks`: each received chunk is forwarded to the network as it
/// arrives, so the object is never buffered whole for the network leg.
/// The stream ends when the channel's sender side is dropped, which
/// finalizes the multipart trailer and lets the request complete.
///
/// A [`CONTENT_RANGE_HEADER`] of `bytes 0-{total-1}/{total}` declares the
/// range covered by this request.
///
/// # Arguments
/// * `client` - The authenticated client
/// * `upload_id` - Session id from [`create_upload_session`]
/// * `name` - Object name
/// * `content_type` - MIME type of the content
/// * `total` - Declared total size in bytes
/// * `chunks` - Channel of body chunks, consumed in order
///
/// # Returns
/// The identifier of the stored object, read from the response body once
/// the stream has been fully consumed.
pub async fn upload_resumable(
    client: &DriveClient,
    upload_id: &str,
    name: &str,
    content_type: &str,
    total: u64,
    chunks: mpsc::Receiver<Bytes>,
) -> Result<String> {
    info!(name, total, upload_id, "Starting resumable upload stream");

    let stream = futures_util::stream::unfold(chunks, |mut chunks| async move {
        chunks
            .recv()
            .await
            .map(|chunk| (Ok::<Bytes, std::convert::Infallible>(chunk), chunks))
    });

    let form = Form::new().part(
        "file",
        file_part(name, content_type, Body::wrap_stream(stream))?,
    );

    let content_range = format!("bytes 0-{}/{}", total.saturating_sub(1), total);

    let id = client
        .request(Method::POST, "/api/upload")
        .query(&[("uploadType", "resumable"), ("uploadId", upload_id)])
        .header(CONTENT_RANGE_HEADER, content_range)
        .multipart(form)
        .send()
        .await
        .context("Failed to send resumable upload request")?
        .error_for_status()
        .context("Resumable upload returned error status")?
        .text()
        .await
        .context("Failed to read resumable upload response body")?;

    info!(name, %id, "Resumable upload complete");
    Ok(id)
}
