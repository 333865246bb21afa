//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use packrat_core::BuildReport;
use serde::Serialize;
use std::io;
use std::io::Write;
use std::path::Path;

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct CreationOutput {
    output_path: String,
    format: String,
    files_added: usize,
    directories_added: usize,
    symlinks_added: usize,
    content_bytes: u64,
    bytes_written: u64,
    overhead_ratio: f64,
    duration_ms: u128,
}

impl CreationOutput {
    fn new(output_path: &Path, report: &BuildReport) -> Self {
        Self {
            output_path: output_path.display().to_string(),
            format: report.format.to_string(),
            files_added: report.files_added,
            directories_added: report.directories_added,
            symlinks_added: report.symlinks_added,
            content_bytes: report.content_bytes,
            bytes_written: report.bytes_written,
            overhead_ratio: report.overhead_ratio(),
            duration_ms: report.duration.as_millis(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_creation_result(&self, output_path: &Path, report: &BuildReport) -> Result<()> {
        let output = JsonOutput::success("create", CreationOutput::new(output_path, report));
        Self::output(&output)
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::failure("create", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use packrat_core::types::ArchiveFormat;

    #[test]
    fn test_creation_output_structure() {
        let mut report = BuildReport::new(ArchiveFormat::TarGz);
        report.files_added = 2;
        report.bytes_written = 4096;

        let output = JsonOutput::success(
            "create",
            CreationOutput::new(Path::new("out.tar.gz"), &report),
        );
        let value: serde_json::Value = serde_json::to_value(&output).unwrap();

        assert_eq!(value["operation"], "create");
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["format"], "tar.gz");
        assert_eq!(value["data"]["files_added"], 2);
        assert_eq!(value["data"]["bytes_written"], 4096);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let output = JsonOutput::failure("create", "boom".to_string());
        let value: serde_json::Value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert!(value.get("data").is_none());
    }
}
