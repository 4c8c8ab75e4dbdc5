//! # contract: capability interfaces the replication core depends on
//!
//! This module defines the traits through which the core talks to the outside world:
//! - [`Destination`]: a collection (a server) that can host copies of stickers and emoji.
//! - [`AssetContent`]: lazy access to an item's binary content (usually a CDN download).
//! - [`ImageCodec`]: decode/encode seam used by the size-budget reducer.
//!
//! It also defines the remote error vocabulary shared by all implementors.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so consumers can generate deterministic mocks
//!   (`MockDestination`, `MockAssetContent`, `MockImageCodec`) for unit/integration tests.
//!
//! ## Error Policy
//! - [`RemoteError::Rejected`] is a pair-scoped, recoverable refusal by the remote side.
//! - [`RemoteError::Unexpected`] covers everything else (transport, decoding of responses)
//!   and aborts a replication run.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Boxed error used at the transport boundary.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Identifier of an object created on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct RemoteId(pub u64);

/// A refusal returned by the remote platform for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[error("{text} ({code})")]
pub struct RemoteRejection {
    /// Machine-readable platform error code (0 when the platform supplied none).
    pub code: u32,
    /// Human-readable reason.
    pub text: String,
}

impl RemoteRejection {
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote rejected request: {0}")]
    Rejected(#[from] RemoteRejection),
    #[error("unexpected remote failure: {0}")]
    Unexpected(TransportError),
}

/// Everything needed to create a sticker in a destination.
#[derive(Debug)]
pub struct NewSticker<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    /// Related emoji (the platform calls these "tags").
    pub emoji_hint: &'a str,
    pub file: &'a [u8],
    /// Audit-log reason.
    pub reason: &'a str,
}

/// Everything needed to create a custom emoji in a destination.
#[derive(Debug)]
pub struct NewEmoji<'a> {
    pub name: &'a str,
    pub image: &'a [u8],
    /// Audit-log reason.
    pub reason: &'a str,
}

/// A target collection capable of hosting replicated stickers and emoji.
///
/// Destinations are opaque handles owned by the remote client; the core only invokes
/// their creation capabilities.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Destination: Send + Sync {
    /// Stable identifier (the server id).
    fn id(&self) -> u64;

    /// Display name, used in logs and reports.
    fn name(&self) -> String;

    /// Create a sticker.
    async fn create_sticker<'a>(&self, req: NewSticker<'a>) -> Result<RemoteId, RemoteError>;

    /// Create a custom emoji from already size-conforming image bytes.
    async fn create_emoji<'a>(&self, req: NewEmoji<'a>) -> Result<RemoteId, RemoteError>;
}

/// Lazy accessor for the binary content of an item.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AssetContent: Send + Sync {
    async fn read(&self) -> Result<Vec<u8>, RemoteError>;
}

/// In-memory content, for items whose bytes are already at hand.
pub struct InMemoryContent(pub Vec<u8>);

#[async_trait]
impl AssetContent for InMemoryContent {
    async fn read(&self) -> Result<Vec<u8>, RemoteError> {
        Ok(self.0.clone())
    }
}

/// Decode/encode seam for the size-budget reducer.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ImageCodec: Send + Sync {
    /// Decode `bytes`, optionally trusting a known format instead of sniffing.
    fn decode(
        &self,
        bytes: &[u8],
        format: Option<ImageFormat>,
    ) -> Result<DynamicImage, image::ImageError>;

    /// Encode `image` in `format`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
    ) -> Result<Vec<u8>, image::ImageError>;
}
