//! Configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::LlmError;

/// Main wayplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Primary LLM provider
    pub llm: LlmConfig,

    /// Optional fallback provider, tried when the primary fails
    #[serde(rename = "llm-fallback")]
    pub llm_fallback: Option<LlmConfig>,

    /// Internet-search provider
    pub search: SearchConfig,

    /// Planning loop limits
    pub planner: PlannerConfig,
}

impl Config {
    /// Validate configuration before use.
    ///
    /// Checks that the required API key environment variables are set so a
    /// run fails fast instead of mid-plan.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if let Some(fallback) = &self.llm_fallback
            && std::env::var(&fallback.api_key_env).is_err()
        {
            return Err(eyre::eyre!(
                "Fallback LLM API key not found. Set the {} environment variable.",
                fallback.api_key_env
            ));
        }
        if std::env::var(&self.search.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Search API key not found. Set the {} environment variable.",
                self.search.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with a fallback chain: explicit path, then
    /// `.wayplan.yml` in the working directory, then the user config dir,
    /// then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".wayplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("wayplan").join("wayplan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("anthropic" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, LlmError> {
        std::env::var(&self.api_key_env).map_err(|_| LlmError::MissingApiKey(self.api_key_env.clone()))
    }

    /// The stock fallback: OpenAI behind the Anthropic-first chain.
    pub fn openai_default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4.1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

/// Internet-search provider configuration (Perplexity-style API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            model: "sonar-pro".to_string(),
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
            base_url: "https://api.perplexity.ai".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
        }
    }
}

/// Planning loop limits.
///
/// The refinement and filling ceilings force forward progress ("good enough,
/// move on"); the validation ceiling is a hard failure when exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Free hours of trip time budgeted per research query
    #[serde(rename = "hours-per-query")]
    pub hours_per_query: f64,

    /// Maximum critique passes in the query refinement loop
    #[serde(rename = "max-refine-passes")]
    pub max_refine_passes: u32,

    /// Cap on finalized queries and on concurrent searches
    #[serde(rename = "max-concurrent-searches")]
    pub max_concurrent_searches: usize,

    /// Maximum slot-filling passes
    #[serde(rename = "max-fill-passes")]
    pub max_fill_passes: u32,

    /// Hard cap on total schedule items
    #[serde(rename = "max-schedule-items")]
    pub max_schedule_items: usize,

    /// Maximum full-schedule validation passes before giving up
    #[serde(rename = "max-validation-passes")]
    pub max_validation_passes: u32,

    /// Max tokens for proposer calls
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            hours_per_query: 6.0,
            max_refine_passes: 5,
            max_concurrent_searches: 10,
            max_fill_passes: 12,
            max_schedule_items: 160,
            max_validation_passes: 5,
            max_tokens: 8192,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "anthropic");
        assert!(config.llm_fallback.is_none());
        assert_eq!(config.search.model, "sonar-pro");
        assert_eq!(config.planner.hours_per_query, 6.0);
        assert_eq!(config.planner.max_validation_passes, 5);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
llm:
  provider: anthropic
  model: claude-sonnet-4-20250514
llm-fallback:
  provider: openai
  model: gpt-4.1
  api-key-env: OPENAI_API_KEY
planner:
  max-fill-passes: 3
"#
        )
        .unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.planner.max_fill_passes, 3);
        // Unspecified fields keep their defaults
        assert_eq!(config.planner.max_refine_passes, 5);
        let fallback = config.llm_fallback.unwrap();
        assert_eq!(fallback.provider, "openai");
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let missing = PathBuf::from("/nonexistent/wayplan.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
