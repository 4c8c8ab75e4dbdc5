//! Source items eligible for replication: custom emoji, stickers and raw image attachments.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::contract::{AssetContent, RemoteError};

/// Platform minimum length for emoji names.
pub const MIN_EMOJI_NAME_LEN: usize = 2;

/// Kind of a source item, with the attributes only that kind carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// A custom emoji (icon asset).
    Emoji { animated: bool },
    /// A server sticker.
    Sticker { emoji_hint: String },
    /// A raw image attached to a message; uploaded as an emoji after size reduction.
    Attachment { content_type: Option<String> },
}

/// Where an item was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    MessageBody,
    Reaction,
    Sticker,
    Attachment,
}

/// An immutable source item.
#[derive(Clone)]
pub struct Item {
    id: u64,
    name: String,
    description: Option<String>,
    kind: ItemKind,
    location: Location,
    content: Arc<dyn AssetContent>,
}

impl Item {
    pub fn emoji(
        id: u64,
        name: impl Into<String>,
        animated: bool,
        location: Location,
        content: Arc<dyn AssetContent>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            kind: ItemKind::Emoji { animated },
            location,
            content,
        }
    }

    pub fn sticker(
        id: u64,
        name: impl Into<String>,
        description: Option<String>,
        emoji_hint: impl Into<String>,
        content: Arc<dyn AssetContent>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description,
            kind: ItemKind::Sticker {
                emoji_hint: emoji_hint.into(),
            },
            location: Location::Sticker,
            content,
        }
    }

    /// `filename` becomes the item name; see [`Item::upload_name`] for the emoji name.
    pub fn attachment(
        id: u64,
        filename: impl Into<String>,
        content_type: Option<String>,
        content: Arc<dyn AssetContent>,
    ) -> Self {
        Self {
            id,
            name: filename.into(),
            description: None,
            kind: ItemKind::Attachment { content_type },
            location: Location::Attachment,
            content,
        }
    }

    /// Records the item at another location, bypassing the per-kind constructors.
    #[cfg(test)]
    pub(crate) fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Fetch the binary content. May suspend on I/O.
    pub async fn read_content(&self) -> Result<Vec<u8>, RemoteError> {
        self.content.read().await
    }

    /// Name shown to users in reports: `:name:` for emoji, the plain name otherwise.
    pub fn display_name(&self) -> String {
        match self.kind {
            ItemKind::Emoji { .. } => format!(":{}:", self.name),
            ItemKind::Sticker { .. } | ItemKind::Attachment { .. } => self.name.clone(),
        }
    }

    /// Name used when creating the remote copy.
    pub fn upload_name(&self) -> String {
        match self.kind {
            ItemKind::Attachment { .. } => sanitize_attachment_name(&self.name),
            ItemKind::Emoji { .. } | ItemKind::Sticker { .. } => self.name.clone(),
        }
    }

    /// Format hint for re-encoding, taken from the content type's subtype (`image/png` -> `png`).
    pub fn format_hint(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Attachment {
                content_type: Some(content_type),
            } => content_type.rsplit('/').next(),
            _ => None,
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.id)
    }
}

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"\W").expect("static regex is valid"))
}

/// Turns an attachment file name into a valid emoji name.
///
/// The extension is dropped when the last `.` is not the first character, every non-word
/// character becomes `_`, and names shorter than [`MIN_EMOJI_NAME_LEN`] get a leading `_`.
pub fn sanitize_attachment_name(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    let mut name = non_word().replace_all(stem, "_").into_owned();
    if name.chars().count() < MIN_EMOJI_NAME_LEN {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::InMemoryContent;

    fn content() -> Arc<dyn AssetContent> {
        Arc::new(InMemoryContent(vec![1, 2, 3]))
    }

    #[test]
    fn sanitize_strips_extension_and_replaces_non_word_chars() {
        assert_eq!(sanitize_attachment_name("my pic!!.png"), "my_pic__");
    }

    #[test]
    fn sanitize_keeps_leading_dot_names_and_pads() {
        let name = sanitize_attachment_name(".x");
        assert_eq!(name, "_x");
        assert!(name.chars().count() >= MIN_EMOJI_NAME_LEN);
    }

    #[test]
    fn sanitize_pads_single_character_stems() {
        assert_eq!(sanitize_attachment_name("a.gif"), "_a");
        assert_eq!(sanitize_attachment_name(""), "_");
    }

    #[test]
    fn sanitize_only_strips_last_extension() {
        assert_eq!(sanitize_attachment_name("cat.final.v2.png"), "cat_final_v2");
    }

    #[test]
    fn display_names_depend_on_kind() {
        let emoji = Item::emoji(1, "blob", false, Location::Reaction, content());
        let sticker = Item::sticker(2, "wave", None, "wave", content());
        let attachment = Item::attachment(3, "my pic.png", Some("image/png".into()), content());

        assert_eq!(emoji.display_name(), ":blob:");
        assert_eq!(sticker.display_name(), "wave");
        assert_eq!(attachment.display_name(), "my pic.png");
        assert_eq!(attachment.upload_name(), "my_pic");
        assert_eq!(attachment.format_hint(), Some("png"));
        assert_eq!(emoji.format_hint(), None);
    }

    #[tokio::test]
    async fn read_content_delegates_to_accessor() {
        let item = Item::emoji(1, "blob", true, Location::MessageBody, content());
        assert_eq!(item.read_content().await.unwrap(), vec![1, 2, 3]);
    }
}
