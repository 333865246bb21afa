//! Output formatter trait and the JSON envelope shared by all results.

use anyhow::Result;
use packrat_core::BuildReport;
use serde::Serialize;
use std::path::Path;

/// Renders command results, warnings and errors for the terminal.
pub trait OutputFormatter {
    /// Reports a finished archive written to `output_path`.
    fn format_creation_result(&self, output_path: &Path, report: &BuildReport) -> Result<()>;

    /// Reports a failed command. Shown even in quiet mode.
    fn format_error(&self, error: &anyhow::Error);

    fn format_warning(&self, message: &str);
}

/// Envelope around every JSON document the CLI prints.
///
/// Exactly one of `data` and `error` is present.
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: &'static str,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: &'static str, data: T) -> Self {
        Self {
            operation,
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    pub fn failure(operation: &'static str, message: String) -> Self {
        Self {
            operation,
            status: Status::Error,
            data: None,
            error: Some(message),
        }
    }
}
