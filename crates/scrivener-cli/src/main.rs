//! Scrivener CLI - Extract structured fields from scanned documents.

use clap::Parser;
use scrivener_cli::{commands, logging, Cli, Command, Config, Formatter};
use scrivener_extractor::SchemaCatalog;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every document succeeded.
async fn run(cli: Cli) -> scrivener_cli::Result<bool> {
    let config = Config::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let schemas_dir = cli
        .schemas_dir
        .unwrap_or_else(|| config.schemas.dir.clone());
    let catalog = SchemaCatalog::new(schemas_dir);

    match cli.command {
        Command::Extract(args) => {
            commands::execute_extract(args, &config, &catalog, &formatter).await
        }
        Command::Schemas => {
            commands::execute_schemas(&catalog, &formatter)?;
            Ok(true)
        }
        Command::Instructions { schema } => {
            commands::execute_instructions(&schema, &catalog)?;
            Ok(true)
        }
    }
}
