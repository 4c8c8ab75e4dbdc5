//! Finding copyable expressions in message content.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Attachment content types that can be uploaded as emoji.
pub const SUPPORTED_ATTACHMENT_TYPES: [&str; 3] = ["image/gif", "image/jpeg", "image/png"];

/// A custom emoji referenced in message markup (`<:name:id>` or `<a:name:id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmojiMarkup {
    pub id: u64,
    pub name: String,
    pub animated: bool,
}

impl EmojiMarkup {
    /// CDN location of the emoji image.
    pub fn url(&self) -> String {
        emoji_url(self.id, self.animated)
    }
}

pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Path of an emoji image below the CDN base.
pub fn emoji_path(id: u64, animated: bool) -> String {
    let ext = if animated { "gif" } else { "png" };
    format!("emojis/{id}.{ext}")
}

/// Path of a sticker image below the CDN base, by the platform's `format_type`.
///
/// PNG and APNG (1, 2) are served as `.png`, GIF (4) as `.gif`. Lottie stickers (3) are
/// JSON animations with no image file and yield `None`.
pub fn sticker_path(id: u64, format_type: u8) -> Option<String> {
    let ext = match format_type {
        1 | 2 => "png",
        4 => "gif",
        _ => return None,
    };
    Some(format!("stickers/{id}.{ext}"))
}

pub fn emoji_url(id: u64, animated: bool) -> String {
    format!("{CDN_BASE}/{}", emoji_path(id, animated))
}

pub fn sticker_url(id: u64) -> String {
    format!("{CDN_BASE}/stickers/{id}.png")
}

fn emoji_markup() -> &'static Regex {
    static EMOJI: OnceLock<Regex> = OnceLock::new();
    EMOJI.get_or_init(|| {
        Regex::new(r"<(?P<anim>a)?:(?P<name>\w{2,}):(?P<id>\d+)>").expect("static regex is valid")
    })
}

/// Distinct custom emoji in `text`, in order of first appearance.
pub fn emojis_in_text(text: &str) -> Vec<EmojiMarkup> {
    let mut seen = HashSet::new();
    emoji_markup()
        .captures_iter(text)
        .filter_map(|caps| {
            // Ids beyond u64 are not real snowflakes.
            let id = caps["id"].parse().ok()?;
            Some(EmojiMarkup {
                id,
                name: caps["name"].to_string(),
                animated: caps.name("anim").is_some(),
            })
        })
        .filter(|emoji| seen.insert(emoji.clone()))
        .collect()
}

pub fn is_supported_attachment(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| SUPPORTED_ATTACHMENT_TYPES.contains(&ct))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_static_and_animated_emoji_once() {
        let text = "hi <:blobcat:123> and <a:party_parrot:456> again <:blobcat:123>";
        let found = emojis_in_text(text);
        assert_eq!(
            found,
            vec![
                EmojiMarkup {
                    id: 123,
                    name: "blobcat".into(),
                    animated: false
                },
                EmojiMarkup {
                    id: 456,
                    name: "party_parrot".into(),
                    animated: true
                },
            ]
        );
        assert_eq!(found[1].url(), "https://cdn.discordapp.com/emojis/456.gif");
    }

    #[test]
    fn ignores_short_names_and_plain_text() {
        assert!(emojis_in_text("<:x:1> :smile: <#123>").is_empty());
    }

    #[test]
    fn only_gif_jpeg_png_attachments_are_supported() {
        assert!(is_supported_attachment(Some("image/png")));
        assert!(is_supported_attachment(Some("image/jpeg")));
        assert!(!is_supported_attachment(Some("image/webp")));
        assert!(!is_supported_attachment(None));
    }

    #[test]
    fn sticker_paths_follow_format_type() {
        assert_eq!(sticker_path(7, 1).as_deref(), Some("stickers/7.png"));
        assert_eq!(sticker_path(7, 2).as_deref(), Some("stickers/7.png"));
        assert_eq!(sticker_path(7, 4).as_deref(), Some("stickers/7.gif"));
        assert_eq!(sticker_path(7, 3), None);
    }
}
