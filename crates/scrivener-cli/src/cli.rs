//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Scrivener - Extract structured fields from scanned documents.
#[derive(Debug, Parser)]
#[command(name = "scrivener")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding `<name>.schema.json` and `<name>.prompt.json`
    #[arg(long, global = true)]
    pub schemas_dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (output paths only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract one document, or every PDF in a directory
    Extract(ExtractArgs),

    /// List the schemas in the schema directory
    Schemas,

    /// Print the format instructions a schema renders to
    Instructions {
        /// Schema name
        schema: String,
    },
}

/// Arguments for the extract command.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// A PDF document, or a directory whose PDFs are processed
    pub path: PathBuf,

    /// Schema name (e.g. `nda`)
    pub schema: String,

    /// Cache directory for extracted text
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Disable the text cache
    #[arg(long, conflicts_with = "cache_dir")]
    pub no_cache: bool,

    /// Maximum documents processed at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// API key for the LLM provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// API key for the document-to-text service
    #[arg(long, env = "LLMWHISPERER_API_KEY", hide_env_values = true)]
    pub ocr_api_key: Option<String>,

    /// LLM model name
    #[arg(short, long)]
    pub model: Option<String>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from(["scrivener", "extract", "contracts/", "nda"]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.path, PathBuf::from("contracts/"));
                assert_eq!(args.schema, "nda");
                assert!(!args.no_cache);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_missing_schema_argument() {
        assert!(Cli::try_parse_from(["scrivener", "extract", "acme.pdf"]).is_err());
    }

    #[test]
    fn test_extra_argument() {
        assert!(Cli::try_parse_from(["scrivener", "extract", "acme.pdf", "nda", "extra"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "scrivener",
            "schemas",
            "-vv",
            "--format",
            "json",
            "--schemas-dir",
            "/etc/scrivener",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, Some(CliFormat::Json));
        assert_eq!(cli.schemas_dir, Some(PathBuf::from("/etc/scrivener")));
        assert!(matches!(cli.command, Command::Schemas));
    }

    #[test]
    fn test_cache_flags_conflict() {
        let result = Cli::try_parse_from([
            "scrivener",
            "extract",
            "acme.pdf",
            "nda",
            "--no-cache",
            "--cache-dir",
            "/tmp/cache",
        ]);
        assert!(result.is_err());
    }
}
