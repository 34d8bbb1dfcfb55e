//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.
//! Recipient lines are validated fail-closed: a single bad line rejects the
//! whole list, and every offending line is reported with its line number.

use crate::campaign::content::detect_media_kind;
use crate::common::error::{ConfigError, ResolveError};
use crate::config::types::{Config, SelectionMode};
use crate::resolver::validate_recipient_lines;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate gateway config
    if config.gateway.base_url.is_empty() {
        errors.push("gateway.base_url is required".to_string());
    }
    if config.gateway.auth_dir.is_empty() {
        errors.push("gateway.auth_dir must not be empty".to_string());
    }

    // Validate message templates
    if config.messages.is_empty() {
        errors.push("messages is empty - at least one template is required".to_string());
    }
    for (i, template) in config.messages.iter().enumerate() {
        if template.name.is_empty() {
            errors.push(format!("messages[{}].name is required", i));
        }
        if template.media.enabled {
            if template.media.path.is_empty() {
                errors.push(format!(
                    "messages[{}].media.path is required when media is enabled",
                    i
                ));
            } else if let Err(e) = detect_media_kind(&template.media.path) {
                errors.push(format!("messages[{}].media.path: {}", i, e));
            }
        } else if template.text.is_empty() {
            errors.push(format!(
                "messages[{}] has neither text nor media configured",
                i
            ));
        }
    }

    // Validate selection settings
    if config.settings.message_selection.mode == SelectionMode::Fixed {
        let index = config.settings.message_selection.fixed_index;
        if index >= config.messages.len() {
            errors.push(format!(
                "settings.message_selection.fixed_index {} out of range ({} message(s) configured)",
                index,
                config.messages.len()
            ));
        }
    }

    // Validate delay bounds
    if config.settings.delay.min > config.settings.delay.max {
        errors.push(format!(
            "settings.delay.min ({}) must not exceed settings.delay.max ({})",
            config.settings.delay.min, config.settings.delay.max
        ));
    }

    if config.settings.default_country_code.is_empty()
        || !config
            .settings
            .default_country_code
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        errors.push("settings.default_country_code must be numeric".to_string());
    }

    if config.settings.mention_inside_group && !config.settings.use_group {
        errors.push("settings.mention_inside_group requires use_group".to_string());
    }

    // Validate recipient configuration for the active mode
    if config.settings.use_group {
        match config.settings.group_jid.as_deref() {
            None | Some("") => {
                errors.push("settings.group_jid is required when use_group is set".to_string())
            }
            Some(_) => {}
        }
    } else {
        if config.recipients.is_empty() {
            errors.push("recipients is empty and use_group is not set".to_string());
        }
        if let Err(ResolveError::InvalidLines(lines)) =
            validate_recipient_lines(&config.recipients)
        {
            for line in lines {
                errors.push(format!("recipients {}", line));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
