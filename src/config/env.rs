//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `STATUSCASTER_CONFIG` - config file path
//! - `STATUSCASTER_GATEWAY_URL` - sidecar base URL
//! - `STATUSCASTER_AUTH_DIR` - credential storage directory

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "STATUSCASTER";

/// Apply environment variable overrides to a config.
///
/// This allows deployment-specific values like the sidecar endpoint to be
/// provided via environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(url) = env::var(format!("{}_GATEWAY_URL", ENV_PREFIX)) {
        config.gateway.base_url = url;
    }
    if let Ok(dir) = env::var(format!("{}_AUTH_DIR", ENV_PREFIX)) {
        config.gateway.auth_dir = dir;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `STATUSCASTER_CONFIG`, otherwise returns "campaign.json".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "campaign.json".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_test_config() -> Config {
        Config {
            gateway: GatewayConfig {
                base_url: "http://fromfile:3981".to_string(),
                auth_dir: "auth_state".to_string(),
            },
            messages: Vec::new(),
            recipients: Vec::new(),
            settings: Settings {
                message_selection: MessageSelection {
                    mode: SelectionMode::Random,
                    fixed_index: 0,
                },
                mention_mode: MentionMode::Grouped,
                use_group: false,
                group_jid: None,
                mention_inside_group: false,
                delay: DelayBounds { min: 1, max: 2 },
                default_country_code: "55".to_string(),
            },
        }
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "STATUSCASTER");
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        env::remove_var("STATUSCASTER_GATEWAY_URL");
        env::remove_var("STATUSCASTER_AUTH_DIR");

        let config = make_test_config();
        let result = apply_env_overrides(config);

        // Should remain unchanged
        assert_eq!(result.gateway.base_url, "http://fromfile:3981");
        assert_eq!(result.gateway.auth_dir, "auth_state");
    }
}
