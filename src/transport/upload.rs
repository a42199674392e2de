//! Upload sub-protocol.
//!
//! Binary payloads do not travel over the channel socket. The device is
//! asked for a one-time socket with `send_image`, the payload is pushed
//! over a separate stream, and the device confirms on the channel under the
//! same correlation ID.
//!
//! # Stream Layout
//!
//! ```text
//! +----------------------+-------------------+-----------------+
//! | header length (u32BE)| JSON UploadHeader | payload bytes   |
//! +----------------------+-------------------+-----------------+
//! ```
//!
//! The client always sends a single chunk (`num = 0`, `total = 1`).

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::{ContentId, RequestId};
use crate::protocol::{ArtCommand, Request, UploadSocketRequest};

use super::{Connection, tls};

// ============================================================================
// Constants
// ============================================================================

/// Version string expected in the upload header.
pub const UPLOAD_PROTOCOL_VERSION: &str = "0.0.1";

/// Format of `image_date`.
const IMAGE_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

// ============================================================================
// UploadHeader
// ============================================================================

/// JSON header preceding the payload on the upload stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHeader {
    /// Chunk index.
    pub num: u32,
    /// Chunk count.
    pub total: u32,
    /// Payload length in bytes.
    pub file_length: usize,
    /// File name shown by the device.
    pub file_name: String,
    /// File type (`png`, `jpg`).
    pub file_type: String,
    /// Secret issued with the upload socket.
    pub sec_key: String,
    /// Protocol version.
    pub version: String,
}

impl UploadHeader {
    /// Header for a payload sent as one chunk.
    #[must_use]
    pub fn single(
        file_length: usize,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        sec_key: impl Into<String>,
    ) -> Self {
        Self {
            num: 0,
            total: 1,
            file_length,
            file_name: file_name.into(),
            file_type: file_type.into(),
            sec_key: sec_key.into(),
            version: UPLOAD_PROTOCOL_VERSION.to_string(),
        }
    }
}

// ============================================================================
// UploadEndpoint
// ============================================================================

/// Socket offered by the device in the `conn_info` of a `send_image` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadEndpoint {
    /// Device address for the upload.
    pub ip: String,
    /// Device port for the upload.
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    /// Secret to echo in the header.
    pub key: String,
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> StdResult<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// UploadRequest
// ============================================================================

/// One payload to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    /// Raw payload.
    pub payload: &'a [u8],
    /// File type (`png`, `jpg`).
    pub file_type: String,
    /// File name placed in the header.
    pub file_name: String,
    /// Landscape matte identifier.
    pub matte_id: String,
    /// Portrait matte identifier.
    pub portrait_matte_id: String,
}

// ============================================================================
// Public API
// ============================================================================

/// Formats a timestamp as `YYYY:MM:DD HH:MM:SS`.
#[must_use]
pub fn image_date(at: DateTime<Utc>) -> String {
    at.format(IMAGE_DATE_FORMAT).to_string()
}

/// Writes the length prefix, the header and the payload, then closes the
/// stream.
///
/// # Errors
///
/// - [`Error::Io`] on any short or failed write; the upload cannot resume
/// - [`Error::Protocol`] if the header does not fit the length prefix
pub async fn write_payload<S>(stream: &mut S, header: &UploadHeader, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let header = serde_json::to_vec(header)?;
    let length = u32::try_from(header.len())
        .map_err(|_| Error::protocol("upload header exceeds the length prefix"))?;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(&header).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

/// Uploads a payload and returns the content ID the device assigned.
///
/// # Errors
///
/// - [`Error::RemoteRejected`] if the device refuses the upload
/// - [`Error::Protocol`] if `conn_info` or the confirmation is malformed
/// - [`Error::Io`] if the upload stream fails
/// - [`Error::UploadTimeout`] if the confirmation does not arrive in time
pub async fn upload(connection: &Connection, upload: UploadRequest<'_>) -> Result<ContentId> {
    let id = RequestId::generate();
    let command = ArtCommand::SendImage {
        file_type: upload.file_type.clone(),
        id: id.to_string(),
        conn_info: UploadSocketRequest {
            d2d_mode: "socket",
            connection_id: rand::random(),
            id: id.to_string(),
        },
        image_date: image_date(Utc::now()),
        matte_id: upload.matte_id,
        portrait_matte_id: upload.portrait_matte_id,
        file_size: upload.payload.len(),
    };

    let request = Request::from_command(&command)?.with_id(id.clone());
    let response = connection.request(request).await?.into_result()?;
    let endpoint: UploadEndpoint = response.decode("conn_info")?;
    debug!(request_id = %id, ip = %endpoint.ip, port = endpoint.port, "Upload socket offered");

    // The confirmation reuses the correlation ID.
    let confirmation = connection.register_response(id.clone())?;

    let header = UploadHeader::single(
        upload.payload.len(),
        upload.file_name,
        upload.file_type,
        endpoint.key,
    );
    let mut stream =
        tls::open_stream(&endpoint.ip, endpoint.port, connection.options().security).await?;
    write_payload(&mut stream, &header, upload.payload).await?;
    debug!(request_id = %id, bytes = upload.payload.len(), "Upload stream written");

    let confirmed = confirmation
        .wait(connection.options().upload_timeout)
        .await
        .map_err(|e| match e {
            Error::RequestTimeout {
                request_id,
                timeout_ms,
            } => Error::upload_timeout(request_id, timeout_ms),
            other => other,
        })?
        .into_result()?;

    let content_id = ContentId::from(confirmed.require_str("content_id")?);
    info!(request_id = %id, %content_id, "Upload confirmed");
    Ok(content_id)
}

// ============================================================================
// Tests
// ============================================================================
