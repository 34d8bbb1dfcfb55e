//! Configuration type definitions.
//!
//! The on-disk format is JSON (see `campaign.example.json`). Everything the
//! orchestrator needs for a run is read from here once, at run start.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub messages: Vec<MessageTemplate>,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub settings: Settings,
}

/// Messaging gateway sidecar endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the protocol sidecar, e.g. "http://127.0.0.1:3981".
    pub base_url: String,
    /// Directory where issued credentials are persisted.
    #[serde(default = "default_auth_dir")]
    pub auth_dir: String,
}

fn default_auth_dir() -> String {
    "auth_state".to_string()
}

/// One configured status message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageTemplate {
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Optional media attachment for a template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: String,
}

/// Campaign delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub message_selection: MessageSelection,
    #[serde(default)]
    pub mention_mode: MentionMode,
    #[serde(default)]
    pub use_group: bool,
    #[serde(default)]
    pub group_jid: Option<String>,
    /// Deliver as one message inside the group itself, mentioning every
    /// member, instead of the private status flow. Requires `use_group`.
    #[serde(default)]
    pub mention_inside_group: bool,
    pub delay: DelayBounds,
    /// Country prefix prepended to bare national numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

fn default_country_code() -> String {
    "55".to_string()
}

/// How the message template is chosen for a send unit.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSelection {
    pub mode: SelectionMode,
    #[serde(default)]
    pub fixed_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Uniformly random index per send unit.
    Random,
    /// Always `fixed_index`.
    Fixed,
}

/// Delivery policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionMode {
    /// Batches of at most 5 recipients, paced with inter-batch delays.
    #[default]
    Grouped,
    /// The whole recipient set as one batch.
    Single,
}

/// Inter-batch delay bounds in seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DelayBounds {
    pub min: u64,
    pub max: u64,
}
