//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use scrivener_extractor::ExtractorConfig;
use scrivener_ocr::{OutputMode, ProcessingMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on `llm.max_retries`
pub const MAX_LLM_RETRIES: u32 = 10;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text cache settings
    pub cache: CacheSettings,

    /// Schema catalog settings
    pub schemas: SchemaSettings,

    /// LLM provider settings
    pub llm: LlmSettings,

    /// Document-to-text service settings
    pub ocr: OcrSettings,

    /// Extraction pipeline settings
    pub extractor: ExtractorConfig,

    /// Global settings
    pub settings: Settings,
}

/// Text cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache directory; `~/.scrivener/cache` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Schema catalog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Directory holding schema and prompt documents
    pub dir: PathBuf,
}

/// LLM provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the chat-completions API
    pub base_url: String,

    /// Model name
    pub model: String,

    /// API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// HTTP timeout per request (seconds)
    pub timeout_secs: u64,

    /// Attempts per call on transient HTTP failures
    pub max_retries: u32,
}

/// Document-to-text service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Base URL of the service
    pub base_url: String,

    /// API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// How the service reads the document
    pub processing_mode: ProcessingMode,

    /// Layout of the returned text
    pub output_mode: OutputMode,

    /// Server-side processing timeout (seconds)
    pub timeout_secs: u64,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enable colored output
    pub color: bool,

    /// Default output format
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding Scrivener's own files (`~/.scrivener`).
    pub fn home() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".scrivener"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home()?.join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; the default path falls back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&contents)?;
        config
            .validate()
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Parse configuration from TOML.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.extractor.validate()?;

        if self.llm.base_url.trim().is_empty() {
            return Err("llm.base_url must not be empty".to_string());
        }
        if self.llm.model.trim().is_empty() {
            return Err("llm.model must not be empty".to_string());
        }
        if self.llm.timeout_secs == 0 {
            return Err("llm.timeout_secs must be greater than 0".to_string());
        }
        if !(1..=MAX_LLM_RETRIES).contains(&self.llm.max_retries) {
            return Err(format!(
                "llm.max_retries must be between 1 and {}",
                MAX_LLM_RETRIES
            ));
        }
        if self.ocr.base_url.trim().is_empty() {
            return Err("ocr.base_url must not be empty".to_string());
        }
        if self.ocr.timeout_secs == 0 {
            return Err("ocr.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Resolved cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::home()?.join("cache")),
        }
    }
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("schemas"),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: scrivener_llm::openai::DEFAULT_BASE_URL.to_string(),
            model: scrivener_llm::openai::DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: scrivener_llm::openai::DEFAULT_TIMEOUT_SECS,
            max_retries: scrivener_llm::openai::DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            base_url: scrivener_ocr::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            processing_mode: ProcessingMode::default(),
            output_mode: OutputMode::default(),
            timeout_secs: scrivener_ocr::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_schema::UnknownFieldPolicy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schemas.dir, PathBuf::from("schemas"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.ocr.processing_mode, ProcessingMode::Ocr);
        assert_eq!(config.ocr.output_mode, OutputMode::LinePrinter);
        assert!(config.settings.color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [cache]
            dir = "/var/cache/scrivener"

            [llm]
            model = "gpt-4o"
            api_key = "sk-test"

            [ocr]
            output_mode = "text"

            [extractor]
            max_parse_retries = 2
            unknown_fields = "ignore"

            [settings]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/var/cache/scrivener"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.base_url, scrivener_llm::openai::DEFAULT_BASE_URL);
        assert_eq!(config.ocr.output_mode, OutputMode::Text);
        assert_eq!(config.ocr.processing_mode, ProcessingMode::Ocr);
        assert_eq!(config.extractor.max_parse_retries, 2);
        assert_eq!(config.extractor.unknown_fields, UnknownFieldPolicy::Ignore);
        assert_eq!(config.extractor.llm_timeout_secs, 120);
        assert_eq!(config.settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[llm\nmodel = 1"),
            Err(CliError::Toml(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[schemas]\ndir = \"/opt/schemas\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.schemas.dir, PathBuf::from("/opt/schemas"));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extractor]\nconcurrency = 0\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_llm_retries_are_bounded() {
        let mut config = Config::default();
        config.llm.max_retries = 40;
        assert!(config.validate().unwrap_err().contains("llm.max_retries"));

        config.llm.max_retries = 0;
        assert!(config.validate().is_err());

        config.llm.max_retries = MAX_LLM_RETRIES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let contents = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::from_toml(&contents).unwrap(), config);
    }
}
