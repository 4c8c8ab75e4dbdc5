/// `load_config` module: Loads a YAML batch file into the catalog and tunables of one replication run.
///
/// This module is the only place where user-supplied YAML is parsed and mapped to domain types.
///
/// # Responsibilities
/// - Parse the batch file into type-safe Rust structs
/// - Expand custom emoji markup found in the optional `message` text into emoji items
/// - Drop attachments whose content type cannot be uploaded as an emoji
/// - Reject emoji recorded at locations only stickers or attachments can have
///
/// Secrets (the bot token) are never read from this file; see [`crate::discord`].
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at the CLI boundary.
use anyhow::Result;
use ideograbber_core::extract::{emoji_url, emojis_in_text, is_supported_attachment, sticker_url};
use ideograbber_core::contract::AssetContent;
use ideograbber_core::{Item, Location, ReplicationConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One source item as written in the batch file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemSpec {
    Emoji {
        id: u64,
        name: String,
        #[serde(default)]
        animated: bool,
        #[serde(default = "default_emoji_location")]
        location: Location,
    },
    Sticker {
        id: u64,
        name: String,
        #[serde(default)]
        description: Option<String>,
        /// Related emoji shown with the sticker.
        emoji: String,
        /// Overrides the CDN location, e.g. for GIF stickers.
        #[serde(default)]
        url: Option<String>,
    },
    Attachment {
        id: u64,
        filename: String,
        url: String,
        #[serde(default)]
        content_type: Option<String>,
    },
}

impl ItemSpec {
    pub fn id(&self) -> u64 {
        match self {
            ItemSpec::Emoji { id, .. }
            | ItemSpec::Sticker { id, .. }
            | ItemSpec::Attachment { id, .. } => *id,
        }
    }

    /// Where the item's bytes are downloaded from.
    pub fn content_url(&self) -> String {
        match self {
            ItemSpec::Emoji { id, animated, .. } => emoji_url(*id, *animated),
            ItemSpec::Sticker { id, url, .. } => url.clone().unwrap_or_else(|| sticker_url(*id)),
            ItemSpec::Attachment { url, .. } => url.clone(),
        }
    }

    /// Builds the catalog item, reading its bytes through `content`.
    pub fn into_item(self, content: Arc<dyn AssetContent>) -> Item {
        match self {
            ItemSpec::Emoji {
                id,
                name,
                animated,
                location,
            } => Item::emoji(id, name, animated, location, content),
            ItemSpec::Sticker {
                id,
                name,
                description,
                emoji,
                ..
            } => Item::sticker(id, name, description, emoji, content),
            ItemSpec::Attachment {
                id,
                filename,
                content_type,
                ..
            } => Item::attachment(id, filename, content_type, content),
        }
    }
}

fn default_emoji_location() -> Location {
    Location::MessageBody
}

/// A loaded batch: what to copy, where, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub requested_by: Option<String>,
    pub replication: ReplicationConfig,
    pub items: Vec<ItemSpec>,
    pub destinations: Vec<u64>,
}

impl BatchConfig {
    pub fn trace_loaded(&self) {
        info!(
            items = self.items.len(),
            destinations = self.destinations.len(),
            "[CONFIG] Loaded batch config"
        );
        self.replication.trace_loaded();
    }
}

#[derive(Debug, Deserialize)]
struct RawBatch {
    #[serde(default)]
    requested_by: Option<String>,
    #[serde(default)]
    replication: ReplicationConfig,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<ItemSpec>,
    #[serde(default)]
    destinations: Vec<u64>,
}

/// Loads a YAML batch file. Returns the merged item list (message emoji first) and settings.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BatchConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawBatch = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let mut items: Vec<ItemSpec> = raw
        .message
        .as_deref()
        .map(emojis_in_text)
        .unwrap_or_default()
        .into_iter()
        .map(|emoji| ItemSpec::Emoji {
            id: emoji.id,
            name: emoji.name,
            animated: emoji.animated,
            location: Location::MessageBody,
        })
        .collect();
    info!(found = items.len(), "Parsed emoji markup from message text");

    for spec in raw.items {
        match &spec {
            ItemSpec::Emoji { id, location, .. }
                if !matches!(location, Location::MessageBody | Location::Reaction) =>
            {
                error!(id, ?location, "Emoji cannot be recorded at this location");
                anyhow::bail!("Emoji {id} has unsupported location {location:?}");
            }
            ItemSpec::Attachment {
                id,
                filename,
                content_type,
                ..
            } if !is_supported_attachment(content_type.as_deref()) => {
                warn!(id, %filename, ?content_type, "Skipping attachment that is not a GIF, JPEG or PNG image");
                continue;
            }
            _ => items.push(spec),
        }
    }

    let config = BatchConfig {
        requested_by: raw.requested_by,
        replication: raw.replication,
        items,
        destinations: raw.destinations,
    };
    config.trace_loaded();
    Ok(config)
}
