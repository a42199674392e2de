//! Art-mode endpoint.
//!
//! Typed wrappers over the `com.samsung.art-app` channel.
//!
//! # Example
//!
//! ```ignore
//! let art = ArtMode::new(ChannelIdentity::art("192.168.1.20", 8002, "SamsungTv"), options);
//! art.connect().await?;
//!
//! for piece in art.available_art().await? {
//!     println!("{} {:?}", piece.id, piece.matte);
//! }
//! art.set_brightness(7).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use image::ImageFormat;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{ChannelIdentity, ConnectionOptions};
use crate::error::{Error, Result};
use crate::identifiers::ContentId;
use crate::protocol::{ArtCommand, ContentRef, Notification, Request, Response};
use crate::transport::Connection;
use crate::transport::upload::{self, UploadRequest};

use super::Endpoint;
use super::artwork::{ArtPiece, Matte, parse_content_list};

// ============================================================================
// Constants
// ============================================================================

/// Category holding user uploads.
pub const MY_PHOTOS_CATEGORY: &str = "MY-C0002";

/// Highest art-mode brightness.
pub const MAX_BRIGHTNESS: u8 = 10;

/// File name placed in upload headers.
const DEFAULT_UPLOAD_FILE_NAME: &str = "upload";

// ============================================================================
// UploadOptions
// ============================================================================

/// Options for [`ArtMode::upload`].
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// File type (`png`, `jpg`); detected from the payload when `None`.
    pub file_type: Option<String>,
    /// Matte for both orientations; `None` means no matte.
    pub matte: Option<Matte>,
    /// File name shown by the device.
    pub file_name: Option<String>,
}

impl UploadOptions {
    /// Creates default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file type.
    #[inline]
    #[must_use]
    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    /// Sets the matte.
    #[inline]
    #[must_use]
    pub fn with_matte(mut self, matte: Matte) -> Self {
        self.matte = Some(matte);
        self
    }

    /// Sets the file name.
    #[inline]
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Clamps a requested brightness into `0..=MAX_BRIGHTNESS`.
#[inline]
#[must_use]
pub fn clamp_brightness(value: i32) -> u8 {
    value.clamp(0, i32::from(MAX_BRIGHTNESS)) as u8
}

/// Detects the upload file type from magic bytes, defaulting to `png`.
#[must_use]
pub fn detect_file_type(payload: &[u8]) -> &'static str {
    match image::guess_format(payload) {
        Ok(ImageFormat::Jpeg) => "jpg",
        _ => "png",
    }
}

#[derive(Debug, Deserialize)]
struct Setting {
    item: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct MatteType {
    matte_type: String,
}

#[derive(Debug, Deserialize)]
struct MatteColor {
    color: String,
}

// ============================================================================
// ArtMode
// ============================================================================

/// Art-mode channel of the device.
#[derive(Debug, Clone)]
pub struct ArtMode {
    connection: Connection,
}

impl ArtMode {
    /// Creates the endpoint; no I/O until [`ArtMode::connect`].
    #[must_use]
    pub fn new(identity: ChannelIdentity, options: ConnectionOptions) -> Self {
        Self {
            connection: Connection::new(identity, options),
        }
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Opens the channel (pairing if needed).
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    /// Closes the channel.
    pub async fn close(&self) {
        self.connection.close().await;
    }

    /// Routes unsolicited art events (e.g. `art_mode_changed`,
    /// `image_selected`) to `handler`.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.connection.set_event_handler(Arc::new(handler));
    }

    /// Stops routing unsolicited events.
    pub fn unsubscribe(&self) {
        self.connection.clear_event_handler();
    }

    /// Sends a command and converts device errors.
    async fn send(&self, command: ArtCommand) -> Result<Response> {
        let request = Request::from_command(&command)?;
        debug!(request_id = %request.id, action = %request.action, "Sending art request");
        self.connection.request(request).await?.into_result()
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Returns the art API version.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not open
    /// - [`Error::RequestTimeout`] if the device does not answer
    /// - [`Error::Protocol`] if the reply carries no `version`
    pub async fn api_version(&self) -> Result<String> {
        let response = self.send(ArtCommand::ApiVersion).await?;
        Ok(response.require_str("version")?.to_string())
    }

    /// Returns the art-mode device information.
    ///
    /// # Errors
    ///
    /// See [`ArtMode::api_version`].
    pub async fn art_mode_info(&self) -> Result<Map<String, Value>> {
        Ok(self.send(ArtCommand::GetDeviceInfo).await?.payload)
    }

    /// Returns `true` if the device is showing art.
    ///
    /// # Errors
    ///
    /// See [`ArtMode::api_version`].
    pub async fn in_art_mode(&self) -> Result<bool> {
        let response = self.send(ArtCommand::GetArtModeStatus).await?;
        Ok(response.get_str("value") == Some("on"))
    }

    // ========================================================================
    // Artwork
    // ========================================================================

    /// Lists uploaded art.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not open
    /// - [`Error::RequestTimeout`] if the device does not answer
    /// - [`Error::Protocol`] if `content_list` is missing or malformed
    pub async fn available_art(&self) -> Result<Vec<ArtPiece>> {
        let response = self
            .send(ArtCommand::GetContentList {
                category_id: MY_PHOTOS_CATEGORY.to_string(),
            })
            .await?;
        let pieces = parse_content_list(response.require_str("content_list")?)?;
        debug!(count = pieces.len(), "Listed art");
        Ok(pieces)
    }

    /// Returns the art currently displayed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the reply has no `content_id`; request
    /// errors as for [`ArtMode::api_version`].
    pub async fn current_art(&self) -> Result<ArtPiece> {
        let response = self.send(ArtCommand::GetCurrentArtwork).await?;
        ArtPiece::from_value(Value::Object(response.payload))
    }

    /// Displays a piece of art.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not open
    /// - [`Error::RequestTimeout`] if the device does not answer
    /// - [`Error::RemoteRejected`] if the device does not know `id`
    pub async fn set_current_art(&self, id: &ContentId, category: Option<&str>) -> Result<()> {
        debug!(content_id = %id, "Selecting art");
        self.send(ArtCommand::SelectImage {
            content_id: id.clone(),
            category: category.map(str::to_string),
            show: true,
        })
        .await?;
        Ok(())
    }

    /// Deletes one piece of art.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteRejected`] ("item does not exist") for
    /// unknown content, and request errors as for [`ArtMode::api_version`].
    pub async fn delete_art(&self, id: &ContentId) -> Result<()> {
        self.delete_art_many(std::slice::from_ref(id)).await
    }

    /// Deletes several pieces of art in one request.
    ///
    /// # Errors
    ///
    /// See [`ArtMode::delete_art`].
    pub async fn delete_art_many(&self, ids: &[ContentId]) -> Result<()> {
        debug!(count = ids.len(), "Deleting art");
        let content_id_list = ids
            .iter()
            .map(|id| ContentRef {
                content_id: id.clone(),
            })
            .collect();
        self.send(ArtCommand::DeleteImageList { content_id_list }).await?;
        Ok(())
    }

    /// Uploads an image and returns its new content ID.
    ///
    /// # Errors
    ///
    /// - [`Error::RemoteRejected`] if the device refuses the upload
    /// - [`Error::Io`] if the upload stream fails
    /// - [`Error::UploadTimeout`] if the device never confirms the image
    /// - [`Error::Protocol`] if `conn_info` or the confirmation is malformed
    pub async fn upload(&self, payload: &[u8], options: UploadOptions) -> Result<ContentId> {
        let file_type = options
            .file_type
            .unwrap_or_else(|| detect_file_type(payload).to_string());
        let matte_id = Matte::wire_id(options.matte.as_ref());
        debug!(bytes = payload.len(), %file_type, %matte_id, "Uploading art");

        upload::upload(
            &self.connection,
            UploadRequest {
                payload,
                file_type,
                file_name: options
                    .file_name
                    .unwrap_or_else(|| DEFAULT_UPLOAD_FILE_NAME.to_string()),
                portrait_matte_id: matte_id.clone(),
                matte_id,
            },
        )
        .await
    }

    // ========================================================================
    // Brightness
    // ========================================================================

    /// Returns the art-mode brightness.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is not open
    /// - [`Error::RequestTimeout`] if the device does not answer
    /// - [`Error::Protocol`] if the settings carry no valid brightness
    pub async fn brightness(&self) -> Result<u8> {
        let response = self.send(ArtCommand::GetArtModeSettings).await?;
        let settings: Vec<Setting> = response.decode("data")?;
        let setting = settings
            .into_iter()
            .find(|setting| setting.item == "brightness")
            .ok_or_else(|| Error::protocol("settings do not include brightness"))?;

        let value = match &setting.value {
            Value::String(text) => text.trim().parse::<u8>().ok(),
            Value::Number(number) => number.as_u64().and_then(|n| u8::try_from(n).ok()),
            _ => None,
        };
        value.ok_or_else(|| Error::protocol(format!("invalid brightness {}", setting.value)))
    }

    /// Sets the art-mode brightness, clamped to `0..=10`.
    ///
    /// Returns the value actually sent.
    ///
    /// # Errors
    ///
    /// See [`ArtMode::api_version`].
    pub async fn set_brightness(&self, value: i32) -> Result<u8> {
        let value = clamp_brightness(value);
        self.send(ArtCommand::SetBrightness { value }).await?;
        Ok(value)
    }

    // ========================================================================
    // Mattes
    // ========================================================================

    /// Lists matte types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `matte_type_list` is malformed.
    pub async fn matte_types(&self) -> Result<Vec<String>> {
        let response = self.send(ArtCommand::GetMatteList).await?;
        let types: Vec<MatteType> = response.decode("matte_type_list")?;
        Ok(types.into_iter().map(|t| t.matte_type).collect())
    }

    /// Lists matte colors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `matte_color_list` is malformed.
    pub async fn matte_colors(&self) -> Result<Vec<String>> {
        let response = self.send(ArtCommand::GetMatteList).await?;
        let colors: Vec<MatteColor> = response.decode("matte_color_list")?;
        Ok(colors.into_iter().map(|c| c.color).collect())
    }

    /// Changes the matte of a piece and reselects it so the change shows.
    ///
    /// # Errors
    ///
    /// See [`ArtMode::set_current_art`].
    pub async fn set_matte(&self, id: &ContentId, matte: Option<&Matte>) -> Result<()> {
        self.send(ArtCommand::ChangeMatte {
            content_id: id.clone(),
            matte_id: Matte::wire_id(matte),
        })
        .await?;
        self.set_current_art(id, None).await
    }
}

#[async_trait]
impl Endpoint for ArtMode {
    fn name(&self) -> &'static str {
        "art-mode"
    }

    async fn connect(&self) -> Result<()> {
        ArtMode::connect(self).await
    }

    async fn close(&self) {
        ArtMode::close(self).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::client::Security;
    use crate::transport::mock::{MockPeer, PeerHandshake};

    const MATTE_TYPES: &str = "[\n  {\n    \"matte_type\": \"none\"\n  },\n  {\n    \"matte_type\": \"modernthin\"\n  },\n  {\n    \"matte_type\": \"modern\"\n  },\n  {\n    \"matte_type\": \"squares\"\n  }\n]";
    const MATTE_COLORS: &str = "[\n  {\n    \"color\": \"black\",\n    \"R\": 34,\n    \"G\": 34,\n    \"B\": 33\n  },\n  {\n    \"color\": \"turquoise\",\n    \"R\": 46,\n    \"G\": 150,\n    \"B\": 141\n  }\n]";

    async fn connected(peer: &MockPeer, dir: &std::path::Path) -> ArtMode {
        let art = ArtMode::new(
            ChannelIdentity::art("127.0.0.1", peer.port(), ""),
            ConnectionOptions::new()
                .with_security(Security::Plain)
                .with_token_dir(dir)
                .with_request_timeout(Duration::from_secs(2)),
        );
        art.connect().await.expect("connect");
        art
    }

    #[test]
    fn test_clamp_brightness() {
        assert_eq!(clamp_brightness(-5), 0);
        assert_eq!(clamp_brightness(15), 10);
        assert_eq!(clamp_brightness(7), 7);
    }

    proptest! {
        #[test]
        fn prop_brightness_always_in_range(value in any::<i32>()) {
            let clamped = clamp_brightness(value);
            prop_assert!(clamped <= MAX_BRIGHTNESS);
            if (0..=10).contains(&value) {
                prop_assert_eq!(i32::from(clamped), value);
            }
        }
    }

    #[test]
    fn test_detect_file_type() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        assert_eq!(detect_file_type(&png), "png");
        assert_eq!(detect_file_type(&jpeg), "jpg");
        assert_eq!(detect_file_type(b"plain bytes"), "png");
    }

    #[tokio::test]
    async fn test_channel_path_and_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        let art = connected(&peer, dir.path()).await;

        // base64("Art")
        assert_eq!(
            peer.paths()[0],
            "/api/v2/channels/com.samsung.art-app?name=QXJ0&token=None"
        );
        art.close().await;
    }

    #[tokio::test]
    async fn test_set_brightness_sends_clamped_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        let art = connected(&peer, dir.path()).await;

        assert_eq!(art.set_brightness(-5).await.expect("low"), 0);
        assert_eq!(art.set_brightness(15).await.expect("high"), 10);
        assert_eq!(art.set_brightness(7).await.expect("mid"), 7);

        let sent: Vec<Value> = peer
            .request_bodies()
            .into_iter()
            .map(|body| body["value"].clone())
            .collect();
        assert_eq!(sent, vec![json!(0), json!(10), json!(7)]);
        art.close().await;
    }

    #[tokio::test]
    async fn test_brightness_from_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.respond_with(|_| {
            let data = json!([
                { "item": "color_temperature", "value": "0" },
                { "item": "brightness", "value": "4", "min": "1", "max": "10" }
            ]);
            Some(json!({ "event": "get_artmode_settings", "data": data.to_string() }))
        });
        let art = connected(&peer, dir.path()).await;

        assert_eq!(art.brightness().await.expect("brightness"), 4);
        art.close().await;
    }

    #[tokio::test]
    async fn test_available_art() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.respond_with(|_| {
            let list = json!([{
                "content_id": "MY_F0016",
                "category_id": "MY-C0002",
                "slideshow": "false",
                "matte_id": "modern_warm",
                "portrait_matte_id": "modern_polar",
                "width": 1920,
                "height": 1080,
                "image_date": "2024:07:11 04:08:44"
            }]);
            Some(json!({ "event": "get_content_list", "content_list": list.to_string() }))
        });
        let art = connected(&peer, dir.path()).await;

        let pieces = art.available_art().await.expect("list");
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].id.as_str(), "MY_F0016");
        assert_eq!(pieces[0].matte, Some(Matte::new("modern", "warm")));
        assert_eq!(peer.request_bodies()[0]["category_id"], MY_PHOTOS_CATEGORY);
        art.close().await;
    }

    #[tokio::test]
    async fn test_matte_lists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.respond_with(|_| {
            Some(json!({
                "event": "get_matte_list",
                "matte_type_list": MATTE_TYPES,
                "matte_color_list": MATTE_COLORS
            }))
        });
        let art = connected(&peer, dir.path()).await;

        assert_eq!(
            art.matte_types().await.expect("types"),
            vec!["none", "modernthin", "modern", "squares"]
        );
        assert_eq!(art.matte_colors().await.expect("colors"), vec!["black", "turquoise"]);
        art.close().await;
    }

    #[tokio::test]
    async fn test_set_matte_reselects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        let art = connected(&peer, dir.path()).await;

        let id = ContentId::from("MY_F0012");
        art.set_matte(&id, Some(&Matte::new("squares", "polar")))
            .await
            .expect("set matte");
        art.set_matte(&id, None).await.expect("clear matte");

        let bodies = peer.request_bodies();
        assert_eq!(bodies[0]["request"], "change_matte");
        assert_eq!(bodies[0]["matte_id"], "squares_polar");
        assert_eq!(bodies[1]["request"], "select_image");
        assert_eq!(bodies[1]["content_id"], "MY_F0012");
        assert_eq!(bodies[2]["matte_id"], "none");
        art.close().await;
    }

    #[tokio::test]
    async fn test_delete_art() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.respond_with(|_| {
            let list = json!([{ "content_id": "MY_F0012" }]);
            Some(json!({ "event": "delete_image_list", "content_id_list": list.to_string() }))
        });
        let art = connected(&peer, dir.path()).await;

        art.delete_art(&ContentId::from("MY_F0012")).await.expect("delete");
        let body = &peer.request_bodies()[0];
        assert_eq!(body["content_id_list"], json!([{ "content_id": "MY_F0012" }]));
        art.close().await;
    }

    #[tokio::test]
    async fn test_delete_missing_art() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.respond_with(|_| Some(json!({ "event": "error", "error_code": "-10" })));
        let art = connected(&peer, dir.path()).await;

        let err = art.delete_art(&ContentId::from("MY_F0012")).await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("item does not exist"));
        art.close().await;
    }

    #[tokio::test]
    async fn test_in_art_mode_and_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.respond_with(|body| match body["request"].as_str() {
            Some("get_artmode_status") => Some(json!({ "event": "artmode_status", "value": "on" })),
            Some("api_version") => Some(json!({ "event": "api_version", "version": "4.3.4.0" })),
            _ => None,
        });
        let art = connected(&peer, dir.path()).await;

        assert!(art.in_art_mode().await.expect("status"));
        assert_eq!(art.api_version().await.expect("version"), "4.3.4.0");
        art.close().await;
    }

    #[tokio::test]
    async fn test_upload_detects_jpeg_and_matte() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        peer.serve_uploads(Some("MY_F0100")).await;
        let art = connected(&peer, dir.path()).await;

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        jpeg.resize(64, 0);
        let id = art
            .upload(&jpeg, UploadOptions::new().with_matte(Matte::new("modern", "warm")))
            .await
            .expect("upload");

        assert_eq!(id.as_str(), "MY_F0100");
        let body = &peer.request_bodies()[0];
        assert_eq!(body["file_type"], "jpg");
        assert_eq!(body["matte_id"], "modern_warm");
        assert_eq!(body["portrait_matte_id"], "modern_warm");
        assert_eq!(peer.uploads()[0].header["fileType"], "jpg");
        art.close().await;
    }

    #[tokio::test]
    async fn test_subscribe_receives_art_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let peer = MockPeer::start(PeerHandshake::ReadyOnly).await;
        let art = connected(&peer, dir.path()).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        art.subscribe(move |notification| {
            let _ = tx.send(notification.event);
        });
        peer.push_service_message(json!({ "event": "image_selected", "content_id": "MY_F0012" }));

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event in time");
        assert_eq!(event.as_deref(), Some("image_selected"));
        art.close().await;
    }
}
