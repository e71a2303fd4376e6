//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use scrivener_extractor::{BatchReport, DocumentOutcome};
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a batch report.
    pub fn format_report(&self, report: &BatchReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_report_json(report),
            OutputFormat::Table => Ok(self.format_report_table(report)),
            OutputFormat::Quiet => Ok(self.format_report_quiet(report)),
        }
    }

    fn format_report_json(&self, report: &BatchReport) -> Result<String> {
        let documents: Vec<serde_json::Value> = report
            .outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(result) => serde_json::json!({
                    "document": outcome.document,
                    "status": "ok",
                    "output": result.output_path,
                    "fingerprint": result.metadata.fingerprint.as_str(),
                    "cache_hit": result.metadata.cache_hit,
                    "text_chars": result.metadata.text_chars,
                    "llm_attempts": result.metadata.llm_attempts,
                    "model": result.metadata.model_name,
                    "extracted_at": result.metadata.extracted_at.to_rfc3339(),
                    "processing_time_ms": result.metadata.processing_time_ms,
                }),
                Err(failure) => serde_json::json!({
                    "document": outcome.document,
                    "status": "failed",
                    "kind": failure.kind,
                    "message": failure.message,
                }),
            })
            .collect();

        let summary = serde_json::json!({
            "run_id": report.run_id.to_string(),
            "succeeded": report.success_count(),
            "failed": report.failure_count(),
            "cancelled": report.cancelled,
            "elapsed_ms": report.elapsed_ms,
            "documents": documents,
        });
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    fn format_report_table(&self, report: &BatchReport) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Document", "Status", "Cache", "Attempts", "Time", "Detail"]);

        for outcome in &report.outcomes {
            builder.push_record(self.row(outcome));
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let summary = format!(
            "{} succeeded, {} failed in {:.1}s (run {})",
            report.success_count(),
            report.failure_count(),
            report.elapsed_ms as f64 / 1000.0,
            report.run_id
        );
        let summary = if report.cancelled {
            self.warning(&format!("Cancelled: {}", summary))
        } else if report.has_failures() {
            self.error(&summary)
        } else {
            self.success(&summary)
        };

        format!("{}\n{}", table, summary)
    }

    fn row(&self, outcome: &DocumentOutcome) -> [String; 6] {
        let document = file_name(&outcome.document);
        match &outcome.result {
            Ok(result) => [
                document,
                self.colorize("ok", "green"),
                if result.metadata.cache_hit { "hit" } else { "miss" }.to_string(),
                result.metadata.llm_attempts.to_string(),
                format!("{} ms", result.metadata.processing_time_ms),
                result.output_path.display().to_string(),
            ],
            Err(failure) => [
                document,
                self.colorize(failure.kind.as_str(), "red"),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                failure.message.clone(),
            ],
        }
    }

    /// Output paths of successful documents, one per line.
    fn format_report_quiet(&self, report: &BatchReport) -> String {
        report
            .succeeded()
            .map(|result| result.output_path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format a list of schema names.
    pub fn format_schemas(&self, names: &[String]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(names)?),
            OutputFormat::Quiet => Ok(names.join("\n")),
            OutputFormat::Table => {
                if names.is_empty() {
                    return Ok(self.warning("No schemas found."));
                }
                let mut builder = Builder::default();
                builder.push_record(["Schema"]);
                for name in names {
                    builder.push_record([name.as_str()]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixtures::report;

    /// Builds reports without a real extraction
    mod fixtures {
        use scrivener_domain::RunId;
        use scrivener_extractor::{
            BatchReport, DocumentFailure, DocumentOutcome, ExtractionMetadata, ExtractionResult,
            FailureKind,
        };
        use scrivener_schema::Record;
        use scrivener_store::fingerprint_bytes;
        use std::path::PathBuf;

        pub fn report() -> BatchReport {
            let ok = ExtractionResult {
                record: Record::new("NDA"),
                output_path: PathBuf::from("/docs/acme.pdf.json"),
                metadata: ExtractionMetadata {
                    document: PathBuf::from("/docs/acme.pdf"),
                    fingerprint: fingerprint_bytes(b"acme").unwrap(),
                    cache_hit: true,
                    text_chars: 1200,
                    llm_attempts: 1,
                    model_name: "mock".to_string(),
                    extracted_at: Default::default(),
                    processing_time_ms: 42,
                },
            };
            BatchReport {
                run_id: RunId::new(),
                outcomes: vec![
                    DocumentOutcome {
                        document: PathBuf::from("/docs/acme.pdf"),
                        result: Ok(ok),
                    },
                    DocumentOutcome {
                        document: PathBuf::from("/docs/globex.pdf"),
                        result: Err(DocumentFailure {
                            kind: FailureKind::ResponseParse,
                            message: "$.parties: expected JSON array, found null".to_string(),
                        }),
                    },
                ],
                cancelled: false,
                elapsed_ms: 1500,
            }
        }
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&report()).unwrap();
        assert!(output.contains("Document"));
        assert!(output.contains("acme.pdf"));
        assert!(output.contains("response-parse"));
        assert!(output.contains("1 succeeded, 1 failed"));
        assert!(output.contains("✗"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["documents"][0]["status"], "ok");
        assert_eq!(value["documents"][0]["cache_hit"], true);
        assert_eq!(value["documents"][1]["kind"], "response_parse");
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_report(&report()).unwrap();
        assert_eq!(output, "/docs/acme.pdf.json");
    }

    #[test]
    fn test_schema_list() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let names = vec!["lease".to_string(), "nda".to_string()];
        assert_eq!(formatter.format_schemas(&names).unwrap(), "lease\nnda");

        let formatter = Formatter::new(OutputFormat::Table, false);
        assert!(formatter.format_schemas(&[]).unwrap().contains("No schemas found"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
