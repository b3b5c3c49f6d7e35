//! Application configuration for WikiForge.
//!
//! User config lives at `~/.wikiforge/wikiforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WikiForgeError};
use crate::types::{DEFAULT_FAST_MODEL, DEFAULT_WRITING_MODEL, ModelConfig, WritingMethod};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "wikiforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".wikiforge";

// ---------------------------------------------------------------------------
// Config structs (matching wikiforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Notion workspace settings.
    #[serde(default)]
    pub notion: NotionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Worker-pool size for leaf content generation.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// How leaf headings are written.
    #[serde(default)]
    pub writing_method: WritingMethod,

    /// Hours a run's status stays queryable after it starts.
    #[serde(default = "default_status_ttl_hours")]
    pub status_ttl_hours: u64,

    /// Status database path (defaults to `~/.wikiforge/status.db`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_db: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            writing_method: WritingMethod::default(),
            status_ttl_hours: default_status_ttl_hours(),
            status_db: None,
        }
    }
}

fn default_concurrency() -> usize {
    5
}
fn default_status_ttl_hours() -> u64 {
    72
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// Model used to break a title into an outline.
    #[serde(default = "default_writing_model")]
    pub outline: String,

    /// Model used to write leaf sections.
    #[serde(default = "default_writing_model")]
    pub writing: String,

    /// Model used to pick emoji icons.
    #[serde(default = "default_fast_model")]
    pub icons: String,

    /// Model used to classify the title into a category.
    #[serde(default = "default_fast_model")]
    pub categories: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_llm_key_env(),
            outline: default_writing_model(),
            writing: default_writing_model(),
            icons: default_fast_model(),
            categories: default_fast_model(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_writing_model() -> String {
    DEFAULT_WRITING_MODEL.into()
}
fn default_fast_model() -> String {
    DEFAULT_FAST_MODEL.into()
}

/// `[notion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Name of the env var holding the integration token.
    #[serde(default = "default_notion_token_env")]
    pub token_env: String,

    /// Notion REST API base URL.
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,

    /// Value of the `Notion-Version` header.
    #[serde(default = "default_notion_version")]
    pub version: String,

    /// Database property holding the page title.
    #[serde(default = "default_title_property")]
    pub title_property: String,

    /// Database select property holding the category.
    #[serde(default = "default_category_property")]
    pub category_property: String,

    /// Database select property holding the generation status.
    #[serde(default = "default_status_property")]
    pub status_property: String,

    /// Status value written when a run completes.
    #[serde(default = "default_done_label")]
    pub done_label: String,

    /// Status value written when a run fails.
    #[serde(default = "default_failed_label")]
    pub failed_label: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token_env: default_notion_token_env(),
            base_url: default_notion_base_url(),
            version: default_notion_version(),
            title_property: default_title_property(),
            category_property: default_category_property(),
            status_property: default_status_property(),
            done_label: default_done_label(),
            failed_label: default_failed_label(),
        }
    }
}

fn default_notion_token_env() -> String {
    "NOTION_TOKEN".into()
}
fn default_notion_base_url() -> String {
    "https://api.notion.com/v1".into()
}
fn default_notion_version() -> String {
    "2022-06-28".into()
}
fn default_title_property() -> String {
    "Name".into()
}
fn default_category_property() -> String {
    "Category".into()
}
fn default_status_property() -> String {
    "Status".into()
}
fn default_done_label() -> String {
    "Done".into()
}
fn default_failed_label() -> String {
    "Failed".into()
}

impl LlmConfig {
    /// Build the immutable per-run model configuration.
    pub fn model_config(&self, api_key: impl Into<String>) -> ModelConfig {
        let mut config = ModelConfig::new(api_key);
        config.outline = self.outline.clone();
        config.writing = self.writing.clone();
        config.icons = self.icons.clone();
        config.categories = self.categories.clone();
        config
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.wikiforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WikiForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.wikiforge/wikiforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WikiForgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WikiForgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WikiForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WikiForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WikiForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the named env var, failing if it is unset or empty.
pub fn resolve_secret(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(WikiForgeError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that both the generation key and the Notion token are available.
pub fn validate_credentials(config: &AppConfig) -> Result<()> {
    resolve_secret(&config.llm.api_key_env, "generation API key")?;
    resolve_secret(&config.notion.token_env, "Notion integration token")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("concurrency"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("NOTION_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.concurrency, 5);
        assert_eq!(parsed.defaults.writing_method, WritingMethod::Single);
        assert_eq!(parsed.notion.status_property, "Status");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
concurrency = 8
writing_method = "reviewed"

[llm]
writing = "gpt-4o"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.concurrency, 8);
        assert_eq!(config.defaults.writing_method, WritingMethod::Reviewed);
        assert_eq!(config.defaults.status_ttl_hours, 72);
        assert_eq!(config.llm.writing, "gpt-4o");
        assert_eq!(config.llm.icons, DEFAULT_FAST_MODEL);
        assert_eq!(config.notion.version, "2022-06-28");
    }

    #[test]
    fn model_config_from_llm_section() {
        let mut llm = LlmConfig::default();
        llm.categories = "cheap-model".into();
        let models = llm.model_config("key");
        assert_eq!(models.categories, "cheap-model");
        assert_eq!(models.outline, DEFAULT_WRITING_MODEL);
    }

    #[test]
    fn credential_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "WF_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_credentials(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("WF_TEST_NONEXISTENT_KEY_12345")
        );
    }
}
