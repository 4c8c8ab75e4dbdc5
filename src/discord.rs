#![doc = "Discord REST integration: bridges the core's `Destination` and `AssetContent` traits to the Discord HTTP API."]
//
//! # Discord Integration (CLI <-> Core)
//!
//! This module wires the capability traits of [`ideograbber_core::contract`] to the real
//! platform:
//! - [`GuildDestination`] creates emoji and stickers in one server.
//! - [`CdnContent`] downloads asset bytes from the CDN or an attachment URL.
//!
//! ## Client Usage
//!
//! - Construct [`DiscordClient`] from the environment (`DISCORD_TOKEN`, optional
//!   `DISCORD_API_BASE` and `DISCORD_CDN_BASE`), wrap it in an `Arc`, then resolve
//!   destinations with [`DiscordClient::guild`].
//! - [`DiscordClient::guild_expressions`] lists a source server's emoji and stickers as
//!   catalog items.
//! - Non-2xx responses become [`RemoteRejection`]s carrying the platform's JSON error code
//!   and message, so the engine records them per pair. Transport failures are reported as
//!   [`RemoteError::Unexpected`] and end the batch.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use ideograbber_core::contract::{
    AssetContent, Destination, NewEmoji, NewSticker, RemoteError, RemoteId, RemoteRejection,
    TransportError,
};
use ideograbber_core::extract::{emoji_path, sticker_path, CDN_BASE};
use ideograbber_core::reduce::mime_type;
use ideograbber_core::{Item, Location};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const AUDIT_LOG_REASON: &str = "X-Audit-Log-Reason";

pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
    cdn_base: String,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            cdn_base: CDN_BASE.to_string(),
        }
    }

    /// Downloads emoji and sticker images listed by [`DiscordClient::guild_expressions`] from `cdn_base`.
    pub fn with_cdn_base(mut self, cdn_base: impl Into<String>) -> Self {
        self.cdn_base = cdn_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn new_from_env() -> Result<Self, TransportError> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        let token = env::var("DISCORD_TOKEN").map_err(|e| {
            tracing::error!(error = ?e, "DISCORD_TOKEN missing in environment");
            format!("DISCORD_TOKEN environment variable not set: {e}")
        })?;
        let api_base = env::var("DISCORD_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.into());
        let cdn_base = env::var("DISCORD_CDN_BASE").unwrap_or_else(|_| CDN_BASE.into());
        tracing::info!(
            token_set = !token.is_empty(),
            api_base = %api_base,
            cdn_base = %cdn_base,
            "[DISCORD] Initialized client from environment"
        );
        Ok(Self::new(token, api_base).with_cdn_base(cdn_base))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Resolves a server the bot can create expressions in.
    pub async fn guild(self: &Arc<Self>, id: u64) -> Result<GuildDestination, RemoteError> {
        #[derive(Deserialize)]
        struct GuildInfo {
            name: String,
        }

        tracing::debug!(guild_id = id, "[DISCORD] Fetching guild");
        let info: GuildInfo = self.get_json(format!("{}/guilds/{id}", self.api_base)).await?;
        Ok(GuildDestination {
            client: Arc::clone(self),
            id,
            name: info.name,
        })
    }

    /// Every custom emoji and sticker of server `id`, emoji first, in the platform's order.
    ///
    /// Emoji are recorded as found in a message body. Lottie stickers have no image file
    /// and are skipped.
    pub async fn guild_expressions(self: &Arc<Self>, id: u64) -> Result<Vec<Item>, RemoteError> {
        #[derive(Deserialize)]
        struct GuildEmoji {
            id: Option<String>,
            name: Option<String>,
            #[serde(default)]
            animated: bool,
        }

        #[derive(Deserialize)]
        struct GuildSticker {
            id: String,
            name: String,
            description: Option<String>,
            #[serde(default)]
            tags: String,
            format_type: u8,
        }

        tracing::debug!(guild_id = id, "[DISCORD] Listing guild expressions");
        let emojis: Vec<GuildEmoji> = self
            .get_json(format!("{}/guilds/{id}/emojis", self.api_base))
            .await?;
        let stickers: Vec<GuildSticker> = self
            .get_json(format!("{}/guilds/{id}/stickers", self.api_base))
            .await?;

        let mut items = Vec::with_capacity(emojis.len() + stickers.len());
        for emoji in emojis {
            // Built-in emoji carry no id and cannot be copied.
            let (Some(raw_id), Some(name)) = (emoji.id, emoji.name) else {
                continue;
            };
            let emoji_id = snowflake(&raw_id)?;
            let url = format!("{}/{}", self.cdn_base, emoji_path(emoji_id, emoji.animated));
            items.push(Item::emoji(
                emoji_id,
                name,
                emoji.animated,
                Location::MessageBody,
                Arc::new(self.content(url)),
            ));
        }
        for sticker in stickers {
            let sticker_id = snowflake(&sticker.id)?;
            let Some(path) = sticker_path(sticker_id, sticker.format_type) else {
                tracing::warn!(
                    guild_id = id,
                    sticker = %sticker.name,
                    format_type = sticker.format_type,
                    "[DISCORD] Skipping sticker without an image file"
                );
                continue;
            };
            let url = format!("{}/{path}", self.cdn_base);
            items.push(Item::sticker(
                sticker_id,
                sticker.name,
                sticker.description.filter(|d| !d.is_empty()),
                sticker.tags,
                Arc::new(self.content(url)),
            ));
        }
        tracing::info!(guild_id = id, found = items.len(), "[DISCORD] Listed guild expressions");
        Ok(items)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, RemoteError> {
        let response = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(unexpected)?;
        checked(response).await?.json().await.map_err(unexpected)
    }

    /// Content accessor for an asset hosted at `url`.
    pub fn content(self: &Arc<Self>, url: impl Into<String>) -> CdnContent {
        CdnContent {
            client: Arc::clone(self),
            url: url.into(),
        }
    }
}

pub struct GuildDestination {
    client: Arc<DiscordClient>,
    id: u64,
    name: String,
}

#[async_trait]
impl Destination for GuildDestination {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn create_sticker<'a>(&self, req: NewSticker<'a>) -> Result<RemoteId, RemoteError> {
        tracing::info!(
            guild_id = self.id,
            sticker = req.name,
            bytes = req.file.len(),
            "[DISCORD] Creating sticker"
        );
        let mime = mime_type(req.file).unwrap_or("image/png");
        let extension = mime.rsplit('/').next().unwrap_or("png");
        let file = Part::bytes(req.file.to_vec())
            .file_name(format!("sticker.{extension}"))
            .mime_str(mime)
            .map_err(unexpected)?;
        let form = Form::new()
            .text("name", req.name.to_string())
            .text("description", req.description.unwrap_or_default().to_string())
            .text("tags", req.emoji_hint.to_string())
            .part("file", file);

        let url = format!("{}/guilds/{}/stickers", self.client.api_base, self.id);
        let response = self
            .client
            .authorized(self.client.http.post(url))
            .header(AUDIT_LOG_REASON, req.reason)
            .multipart(form)
            .send()
            .await
            .map_err(unexpected)?;
        created_id(response).await
    }

    async fn create_emoji<'a>(&self, req: NewEmoji<'a>) -> Result<RemoteId, RemoteError> {
        tracing::info!(
            guild_id = self.id,
            emoji = req.name,
            bytes = req.image.len(),
            "[DISCORD] Creating emoji"
        );
        let body = serde_json::json!({
            "name": req.name,
            "image": data_uri(req.image),
            "roles": [],
        });

        let url = format!("{}/guilds/{}/emojis", self.client.api_base, self.id);
        let response = self
            .client
            .authorized(self.client.http.post(url))
            .header(AUDIT_LOG_REASON, req.reason)
            .json(&body)
            .send()
            .await
            .map_err(unexpected)?;
        created_id(response).await
    }
}

/// Downloads an asset. CDN URLs need no authorization.
pub struct CdnContent {
    client: Arc<DiscordClient>,
    url: String,
}

#[async_trait]
impl AssetContent for CdnContent {
    async fn read(&self) -> Result<Vec<u8>, RemoteError> {
        tracing::debug!(url = %self.url, "[DISCORD] Downloading asset");
        let response = self
            .client
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(unexpected)?;
        let bytes = checked(response).await?.bytes().await.map_err(unexpected)?;
        Ok(bytes.to_vec())
    }
}

/// Encodes image bytes as a `data:` URI, as the emoji endpoint expects.
pub fn data_uri(image: &[u8]) -> String {
    let mime = mime_type(image).unwrap_or("image/png");
    format!("data:{mime};base64,{}", STANDARD.encode(image))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u32,
    message: Option<String>,
}

/// Builds the rejection for a non-2xx response from its status and body.
///
/// JSON bodies carry `code` and `message`; anything else is kept as text with code 0.
pub fn rejection_from(status: StatusCode, body: &str) -> RemoteRejection {
    let fallback = || {
        format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("request failed")
        )
    };
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => RemoteRejection::new(parsed.code, parsed.message.unwrap_or_else(fallback)),
        Err(_) if body.trim().is_empty() => RemoteRejection::new(0, fallback()),
        Err(_) => RemoteRejection::new(0, body.trim()),
    }
}

async fn checked(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.map_err(unexpected)?;
    let rejection = rejection_from(status, &body);
    tracing::debug!(status = status.as_u16(), code = rejection.code, "[DISCORD] Request rejected");
    Err(rejection.into())
}

async fn created_id(response: Response) -> Result<RemoteId, RemoteError> {
    #[derive(Deserialize)]
    struct Created {
        id: String,
    }

    let created: Created = checked(response).await?.json().await.map_err(unexpected)?;
    Ok(RemoteId(snowflake(&created.id)?))
}

fn snowflake(raw: &str) -> Result<u64, RemoteError> {
    raw.parse::<u64>().map_err(unexpected)
}

fn unexpected<E>(e: E) -> RemoteError
where
    E: std::error::Error + Send + Sync + 'static,
{
    RemoteError::Unexpected(Box::new(e))
}
