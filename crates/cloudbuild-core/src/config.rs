//! Configuration loading for the cloud build bot.
//!
//! The config is a JSON file with two sections, `discord_bot` and
//! `unity_cloud_build`. Any string in the file (keys included) may contain
//! `${NAME}` placeholders, which are replaced with the value of the
//! environment variable `NAME` before the config is deserialized. Unset
//! variables become empty strings.
//!
//! # Environment Variables
//!
//! - `CLOUDBUILD_CONFIG`: Override the config file path

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::catalog::BuildTargetCatalog;
use crate::error::ConfigError;

/// Environment variable for a custom config file path.
pub const CONFIG_PATH_ENV: &str = "CLOUDBUILD_CONFIG";

/// Default config file location, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Matches `${NAME}` placeholders.
static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.+?)\}").expect("Invalid env var regex"));

/// Complete application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub discord_bot: DiscordBotConfig,
    pub unity_cloud_build: CloudBuildConfig,
}

/// Chat side of the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token.
    pub token: String,
    /// Name of the server (guild) the bot must be a member of.
    pub guild: String,
    /// Display name of the bot, used in log lines only.
    pub bot_name: String,
    /// Channels the bot listens to. Messages elsewhere are ignored.
    pub bot_channels: Vec<String>,
    /// Channel carrying build notifications from the build service.
    #[serde(default = "default_build_channel")]
    pub build_channel: String,
    /// Channel successful build notifications are re-posted to.
    #[serde(default = "default_output_channel")]
    pub output_channel: String,
    /// Author name of the build service integration.
    #[serde(default = "default_build_event_author")]
    pub build_event_author: String,
    /// Text that closes the @-mention in raw message content.
    #[serde(default = "default_mention_marker")]
    pub mention_marker: String,
}

/// Build service side of the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudBuildConfig {
    /// API root, e.g. `https://build-api.cloud.unity3d.com/api/v1/orgs/acme`.
    pub base_url: String,
    /// Static credential sent as `Authorization: Basic {api_key}`.
    pub api_key: String,
    pub project_id: String,
    /// Display name used to tag log lines.
    pub project_name: String,
    /// Build target name to remote build target id.
    pub cloud_build_targets: BuildTargetCatalog,
}

fn default_build_channel() -> String {
    "build".to_string()
}

fn default_output_channel() -> String {
    "testing".to_string()
}

fn default_build_event_author() -> String {
    "Unity".to_string()
}

fn default_mention_marker() -> String {
    "> ".to_string()
}

/// Get the config file path.
///
/// Uses `CLOUDBUILD_CONFIG` if set, otherwise `config/config.json`.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load and validate the config file, substituting environment variables.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, does not
/// match the expected shape, or leaves a required value empty.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&raw, |name| std::env::var(name).ok())
}

/// Parse config JSON, resolving placeholders with `lookup`.
pub fn parse_config<F>(raw: &str, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: Value = serde_json::from_str(raw)?;
    let value = interpolate_value(value, &lookup);
    let config: AppConfig = serde_json::from_value(value)?;
    config.validate()?;
    for name in config.unity_cloud_build.cloud_build_targets.unreachable_names() {
        warn!(
            target_name = name,
            "Build target has upper-case letters and cannot be requested from chat"
        );
    }
    Ok(config)
}

/// Replace every `${NAME}` in `input` with `lookup(NAME)`, or "" when unset.
pub fn interpolate<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR_REGEX
        .replace_all(input, |caps: &Captures| lookup(&caps[1]).unwrap_or_default())
        .into_owned()
}

fn interpolate_value<F>(value: Value, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => Value::String(interpolate(&s, lookup)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| interpolate_value(item, lookup))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (interpolate(&k, lookup), interpolate_value(v, lookup)))
                .collect(),
        ),
        other => other,
    }
}

impl AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("discord_bot.token", &self.discord_bot.token),
            ("discord_bot.guild", &self.discord_bot.guild),
            ("unity_cloud_build.base_url", &self.unity_cloud_build.base_url),
            ("unity_cloud_build.api_key", &self.unity_cloud_build.api_key),
            ("unity_cloud_build.project_id", &self.unity_cloud_build.project_id),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} is empty", key)));
            }
        }
        if self.discord_bot.mention_marker.is_empty() {
            return Err(ConfigError::Invalid(
                "discord_bot.mention_marker is empty".to_string(),
            ));
        }
        Ok(())
    }
}
