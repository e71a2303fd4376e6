//! Schema catalog: schema and prompt documents paired by name
//!
//! A catalog is a directory holding `<name>.schema.json` and `<name>.prompt.json` for
//! each extraction profile. Loading a profile compiles the schema and validates the
//! prompt, so every configuration problem surfaces before a document is touched.

use crate::error::ExtractorError;
use crate::prompt::PromptConfig;
use scrivener_domain::TypeModel;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File suffix of schema documents
pub const SCHEMA_SUFFIX: &str = ".schema.json";

/// File suffix of prompt documents
pub const PROMPT_SUFFIX: &str = ".prompt.json";

/// A compiled schema together with its prompt
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    /// Profile name
    pub name: String,

    /// Compiled type model
    pub model: TypeModel,

    /// Validated prompt document
    pub prompt: PromptConfig,
}

/// Directory of extraction profiles
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    dir: PathBuf,
}

impl SchemaCatalog {
    /// Catalog rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Catalog directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the schema document for `name`
    pub fn schema_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, SCHEMA_SUFFIX))
    }

    /// Path of the prompt document for `name`
    pub fn prompt_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, PROMPT_SUFFIX))
    }

    /// Names of profiles that have both documents, sorted
    pub fn names(&self) -> Result<Vec<String>, ExtractorError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            ExtractorError::Config(format!(
                "Failed to list schema directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                file_name.strip_suffix(SCHEMA_SUFFIX).map(str::to_string)
            })
            .filter(|name| self.prompt_path(name).is_file())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load and validate the profile `name`
    pub fn load(&self, name: &str) -> Result<ExtractionProfile, ExtractorError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ExtractorError::Config(format!(
                "Invalid schema name '{}'",
                name
            )));
        }

        let schema_path = self.schema_path(name);
        let schema_json = fs::read_to_string(&schema_path).map_err(|e| {
            ExtractorError::Config(format!(
                "Schema '{}' not found ({}): {}",
                name,
                schema_path.display(),
                e
            ))
        })?;
        let model = scrivener_schema::compile_str(&schema_json)?;
        let prompt = PromptConfig::load(&self.prompt_path(name))?;

        info!(
            "Loaded schema '{}': root `{}`, {} record types",
            name,
            model.root().name,
            model.len()
        );

        Ok(ExtractionProfile {
            name: name.to_string(),
            model,
            prompt,
        })
    }
}
