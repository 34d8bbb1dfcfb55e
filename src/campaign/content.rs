//! Message content building.
//!
//! Turns a configured template into concrete send content. Media existence
//! is re-checked on disk here, immediately before use, so a file removed
//! after configuration surfaces as a hard error naming the missing path.

use std::path::Path;

use rand::Rng;

use crate::common::error::CampaignError;
use crate::config::types::MessageTemplate;
use crate::gateway::types::MessageContent;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "3gp"];

/// Number of text-status font variants offered by the backend.
const FONT_COUNT: u8 = 9;

/// Kind of media attachment, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Infer the media kind from a path's extension.
pub fn detect_media_kind(path: &str) -> Result<MediaKind, CampaignError> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(CampaignError::UnsupportedMedia { extension })
    }
}

/// Build the send content for one unit of sending.
///
/// Text-only templates get a random font and background color, as the
/// backend renders text statuses with styling.
pub fn build_content(template: &MessageTemplate) -> Result<MessageContent, CampaignError> {
    if !template.media.enabled {
        let mut rng = rand::thread_rng();
        return Ok(MessageContent::Text {
            text: template.text.clone(),
            font: rng.gen_range(0..FONT_COUNT),
            background_color: random_background_color(&mut rng),
        });
    }

    let path = &template.media.path;
    let kind = detect_media_kind(path)?;

    if !Path::new(path).exists() {
        return Err(CampaignError::MediaMissing { path: path.clone() });
    }

    Ok(match kind {
        MediaKind::Image => MessageContent::Image {
            path: path.clone(),
            caption: template.text.clone(),
        },
        MediaKind::Video => MessageContent::Video {
            path: path.clone(),
            caption: template.text.clone(),
        },
    })
}

fn random_background_color(rng: &mut impl Rng) -> String {
    format!("#{:06x}", rng.gen_range(0..0x1000000u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::MediaConfig;

    fn text_template(text: &str) -> MessageTemplate {
        MessageTemplate {
            name: "Promo".to_string(),
            text: text.to_string(),
            media: MediaConfig::default(),
        }
    }

    fn media_template(path: &str) -> MessageTemplate {
        MessageTemplate {
            name: "Clip".to_string(),
            text: "caption".to_string(),
            media: MediaConfig {
                enabled: true,
                path: path.to_string(),
            },
        }
    }

    #[test]
    fn test_detect_media_kind() {
        assert_eq!(detect_media_kind("a/b.jpg").unwrap(), MediaKind::Image);
        assert_eq!(detect_media_kind("a/b.PNG").unwrap(), MediaKind::Image);
        assert_eq!(detect_media_kind("clip.mp4").unwrap(), MediaKind::Video);
        assert_eq!(detect_media_kind("clip.webm").unwrap(), MediaKind::Video);
    }

    #[test]
    fn test_detect_unsupported_extension() {
        let err = detect_media_kind("notes.pdf").unwrap_err();
        assert!(matches!(
            err,
            CampaignError::UnsupportedMedia { ref extension } if extension == "pdf"
        ));
    }

    #[test]
    fn test_build_text_content_gets_styling() {
        let content = build_content(&text_template("Hello")).unwrap();
        match content {
            MessageContent::Text {
                text,
                font,
                background_color,
            } => {
                assert_eq!(text, "Hello");
                assert!(font < FONT_COUNT);
                assert_eq!(background_color.len(), 7);
                assert!(background_color.starts_with('#'));
            }
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_build_media_content_missing_file_names_path() {
        let err = build_content(&media_template("/definitely/missing.jpg")).unwrap_err();
        match err {
            CampaignError::MediaMissing { path } => assert_eq!(path, "/definitely/missing.jpg"),
            other => panic!("expected MediaMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_build_media_content_existing_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("statuscaster-content-test-{}.jpg", std::process::id()));
        std::fs::write(&path, b"fake").unwrap();

        let content = build_content(&media_template(path.to_str().unwrap())).unwrap();
        match content {
            MessageContent::Image { caption, .. } => assert_eq!(caption, "caption"),
            other => panic!("expected image content, got {:?}", other),
        }

        let _ = std::fs::remove_file(&path);
    }
}
