//! Command implementations.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::discovery::discover_documents;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use scrivener_extractor::{BatchRunner, Extractor, SchemaCatalog};
use scrivener_llm::OpenAiProvider;
use scrivener_ocr::WhispererClient;
use scrivener_store::FileCache;
use std::time::Duration;
use tracing::info;

/// Run the extract command.
///
/// Returns whether every document succeeded.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    catalog: &SchemaCatalog,
    formatter: &Formatter,
) -> Result<bool> {
    let profile = catalog.load(&args.schema)?;
    let documents = discover_documents(&args.path)?;

    let llm_key = credential(args.llm_api_key, &config.llm.api_key).ok_or_else(|| {
        CliError::Config(
            "No LLM API key: pass --llm-api-key, set OPENAI_API_KEY, or set llm.api_key".into(),
        )
    })?;
    let ocr_key = credential(args.ocr_api_key, &config.ocr.api_key).ok_or_else(|| {
        CliError::Config(
            "No OCR API key: pass --ocr-api-key, set LLMWHISPERER_API_KEY, or set ocr.api_key"
                .into(),
        )
    })?;

    let llm = OpenAiProvider::new(llm_key)
        .with_base_url(config.llm.base_url.as_str())
        .with_model(args.model.as_deref().unwrap_or(&config.llm.model))
        .with_timeout(Duration::from_secs(config.llm.timeout_secs))
        .with_max_retries(config.llm.max_retries);

    let ocr = WhispererClient::new(ocr_key)
        .with_base_url(config.ocr.base_url.as_str())
        .with_processing_mode(config.ocr.processing_mode)
        .with_output_mode(config.ocr.output_mode)
        .with_timeout(Duration::from_secs(config.ocr.timeout_secs));

    let cache = if args.no_cache {
        FileCache::disabled()
    } else {
        let dir = match args.cache_dir {
            Some(dir) => dir,
            None => config.cache_dir()?,
        };
        FileCache::open_or_disabled(dir)
    };

    let mut extractor_config = config.extractor.clone();
    if let Some(concurrency) = args.concurrency {
        extractor_config.concurrency = concurrency;
    }

    let extractor = Extractor::new(
        llm,
        ocr,
        cache,
        profile.model,
        &profile.prompt,
        extractor_config,
    )?;

    info!(
        "Extracting {} document(s) with schema '{}'",
        documents.len(),
        profile.name
    );
    let runner = BatchRunner::new(extractor);
    let report = runner.run(documents).await;

    // The blocking HTTP clients own runtimes that must not be dropped on an async worker.
    tokio::task::spawn_blocking(move || drop(runner))
        .await
        .map_err(|e| CliError::Config(format!("Failed to release clients: {}", e)))?;

    println!("{}", formatter.format_report(&report)?);
    Ok(!report.has_failures())
}

/// Run the schemas command.
pub fn execute_schemas(catalog: &SchemaCatalog, formatter: &Formatter) -> Result<()> {
    let names = catalog.names()?;
    println!("{}", formatter.format_schemas(&names)?);
    Ok(())
}

/// Run the instructions command.
pub fn execute_instructions(schema: &str, catalog: &SchemaCatalog) -> Result<()> {
    let profile = catalog.load(schema)?;
    print!("{}", scrivener_schema::render(&profile.model));
    Ok(())
}

/// First non-blank credential, command line before configuration file.
fn credential(flag: Option<String>, configured: &Option<String>) -> Option<String> {
    flag.into_iter()
        .chain(configured.iter().cloned())
        .find(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::fs;
    use std::path::PathBuf;

    const SCHEMA: &str = r#"{"Doc": {"title": {"type": "string", "description": "Title"}}}"#;
    const PROMPT: &str = r#"{
        "system_message": "Extract.",
        "human_message": "{format_instructions}\n{document_text}",
        "temperature": 0
    }"#;

    fn catalog() -> (tempfile::TempDir, SchemaCatalog) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.schema.json"), SCHEMA).unwrap();
        fs::write(dir.path().join("doc.prompt.json"), PROMPT).unwrap();
        let catalog = SchemaCatalog::new(dir.path());
        (dir, catalog)
    }

    fn args(path: PathBuf, schema: &str) -> ExtractArgs {
        ExtractArgs {
            path,
            schema: schema.to_string(),
            cache_dir: None,
            no_cache: true,
            concurrency: None,
            llm_api_key: None,
            ocr_api_key: None,
            model: None,
        }
    }

    #[test]
    fn test_credential_precedence() {
        let configured = Some("from-config".to_string());
        assert_eq!(
            credential(Some("from-flag".into()), &configured).as_deref(),
            Some("from-flag")
        );
        assert_eq!(credential(None, &configured).as_deref(), Some("from-config"));
        assert_eq!(
            credential(Some("  ".into()), &configured).as_deref(),
            Some("from-config")
        );
        assert_eq!(credential(None, &None), None);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_processing() {
        let (dir, catalog) = catalog();
        let doc = dir.path().join("acme.pdf");
        fs::write(&doc, b"%PDF").unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let err = execute_extract(args(doc.clone(), "doc"), &Config::default(), &catalog, &formatter)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(!dir.path().join("acme.pdf.json").exists());
    }

    #[tokio::test]
    async fn test_unknown_schema_is_fatal() {
        let (dir, catalog) = catalog();
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let err = execute_extract(
            args(dir.path().to_path_buf(), "lease"),
            &Config::default(),
            &catalog,
            &formatter,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("lease"));
    }

    #[tokio::test]
    async fn test_empty_directory_is_fatal() {
        let (_dir, catalog) = catalog();
        let docs = tempfile::tempdir().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let err = execute_extract(
            args(docs.path().to_path_buf(), "doc"),
            &Config::default(),
            &catalog,
            &formatter,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }

    #[test]
    fn test_instructions_command() {
        let (_dir, catalog) = catalog();
        assert!(execute_instructions("doc", &catalog).is_ok());
        assert!(execute_instructions("missing", &catalog).is_err());
    }
}
