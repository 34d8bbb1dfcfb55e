//! Configuration file parsing (JSON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    load_config_str(&content)
}

/// Load configuration from a JSON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{MentionMode, SelectionMode};

    const MINIMAL: &str = r#"{
        "gateway": { "base_url": "http://127.0.0.1:3981" },
        "messages": [
            { "name": "Promo", "text": "Hello everyone" }
        ],
        "recipients": ["5511987654321"],
        "settings": {
            "message_selection": { "mode": "random" },
            "delay": { "min": 30, "max": 90 }
        }
    }"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = load_config_str(MINIMAL).unwrap();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:3981");
        assert_eq!(config.gateway.auth_dir, "auth_state");
        assert_eq!(config.messages.len(), 1);
        assert!(!config.messages[0].media.enabled);
        assert_eq!(config.settings.message_selection.mode, SelectionMode::Random);
        assert_eq!(config.settings.mention_mode, MentionMode::Grouped);
        assert_eq!(config.settings.default_country_code, "55");
        assert!(!config.settings.use_group);
        assert!(!config.settings.mention_inside_group);
    }

    #[test]
    fn test_parse_full_settings() {
        let content = r#"{
            "gateway": { "base_url": "http://localhost:1234", "auth_dir": "/var/lib/auth" },
            "messages": [
                { "name": "Clip", "text": "caption", "media": { "enabled": true, "path": "assets/clip.mp4" } }
            ],
            "recipients": [],
            "settings": {
                "message_selection": { "mode": "fixed", "fixed_index": 0 },
                "mention_mode": "single",
                "use_group": true,
                "group_jid": "12036302@g.us",
                "mention_inside_group": true,
                "delay": { "min": 5, "max": 10 },
                "default_country_code": "62"
            }
        }"#;

        let config = load_config_str(content).unwrap();
        assert_eq!(config.settings.message_selection.mode, SelectionMode::Fixed);
        assert_eq!(config.settings.mention_mode, MentionMode::Single);
        assert!(config.settings.use_group);
        assert_eq!(config.settings.group_jid.as_deref(), Some("12036302@g.us"));
        assert!(config.settings.mention_inside_group);
        assert_eq!(config.settings.default_country_code, "62");
        assert!(config.messages[0].media.enabled);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = load_config_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config("/nonexistent/campaign.json");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
