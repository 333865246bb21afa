//! Human-readable output with optional colors.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use packrat_core::BuildReport;
use std::path::Path;

const SIZE_SUFFIXES: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn row(&self, label: &str, value: impl std::fmt::Display) {
        self.line(&format!("  {:<16}{value}", format!("{label}:")));
    }

    /// Scales by 1024 while the value is strictly larger than 1024, so
    /// exactly 1024 bytes still prints as `1024.0 B`.
    fn format_size(bytes: u64) -> String {
        let mut size = bytes as f64;
        let mut unit = 0;
        while size > 1024.0 && unit + 1 < SIZE_SUFFIXES.len() {
            size /= 1024.0;
            unit += 1;
        }
        format!("{size:.1} {}", SIZE_SUFFIXES[unit])
    }

    fn format_count(n: usize) -> String {
        let digits = n.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        grouped
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_creation_result(&self, output_path: &Path, report: &BuildReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let marker = if self.use_colors {
            format!("{} ", style("✓").green().bold())
        } else {
            String::new()
        };
        self.line(&format!("{marker}Archive created: {}", output_path.display()));
        self.line("");
        self.row("Format", report.format);
        self.row("Files added", Self::format_count(report.files_added));
        self.row("Directories", Self::format_count(report.directories_added));
        self.row("Archive size", Self::format_size(report.bytes_written));

        if self.verbose {
            self.row("Symlinks", Self::format_count(report.symlinks_added));
            self.row("Content size", Self::format_size(report.content_bytes));
            self.row("Duration", format!("{:?}", report.duration));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        let prefix = if self.use_colors {
            style("ERROR:").red().bold().to_string()
        } else {
            "ERROR:".to_string()
        };
        let _ = Term::stderr().write_line(&format!("{prefix} {error:?}"));
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_colors {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARNING:".to_string()
        };
        let _ = Term::stderr().write_line(&format!("{prefix} {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(HumanFormatter::format_size(0), "0.0 B");
        assert_eq!(HumanFormatter::format_size(512), "512.0 B");
        assert_eq!(HumanFormatter::format_size(1024), "1024.0 B");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(HumanFormatter::format_size(5 * 1024_u64.pow(4)), "5.0 TB");
        assert_eq!(
            HumanFormatter::format_size(2048 * 1024_u64.pow(4)),
            "2048.0 TB"
        );
    }

    #[test]
    fn test_format_count() {
        assert_eq!(HumanFormatter::format_count(0), "0");
        assert_eq!(HumanFormatter::format_count(999), "999");
        assert_eq!(HumanFormatter::format_count(1000), "1,000");
        assert_eq!(HumanFormatter::format_count(123_456), "123,456");
        assert_eq!(HumanFormatter::format_count(1_234_567), "1,234,567");
    }
}
