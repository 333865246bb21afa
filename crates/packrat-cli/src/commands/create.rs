//! Create command implementation.

use crate::cli::CreateArgs;
use crate::error::convert_archive_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use anyhow::bail;
use packrat_core::ArchiveBuilder;
use packrat_core::BuildConfig;
use packrat_core::CancellationToken;
use packrat_core::config::ZipCompression;
use packrat_core::types::ArchiveFormat;
use packrat_core::types::detect_format;
use std::thread;
use std::time::Duration;
use tracing::debug;

const DEFAULT_LEVEL: u32 = 6;

pub fn execute(args: &CreateArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Output file '{}' already exists\n\
             HINT: Use --force to overwrite it.",
            args.output.display()
        );
    }

    let format = args
        .format
        .or_else(|| detect_format(&args.output).ok());
    if args.deflate && format.is_some_and(|f| f != ArchiveFormat::Zip) {
        formatter.format_warning("--deflate only applies to zip archives and is ignored");
    }

    let config = build_config(args);

    let cancel = CancellationToken::new();
    if let Some(seconds) = args.timeout {
        let token = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            debug!(seconds, "timeout reached, cancelling build");
            token.cancel();
        });
    }

    let mut builder = ArchiveBuilder::new()
        .output(&args.output)
        .add_sources(&args.sources)
        .config(config)
        .cancellation(cancel);
    if let Some(format) = args.format {
        builder = builder.format(format);
    }

    let report = builder
        .build()
        .map_err(|err| convert_archive_error(err, &args.output))?;

    formatter.format_creation_result(&args.output, &report)?;

    Ok(())
}

fn build_config(args: &CreateArgs) -> BuildConfig {
    let level = args.level.unwrap_or(DEFAULT_LEVEL);
    let compression = if args.deflate {
        ZipCompression::Deflate { level }
    } else {
        ZipCompression::Stored
    };

    BuildConfig::default()
        .with_exclude_patterns(args.exclude.clone())
        .with_preserve_permissions(!args.no_permissions)
        .with_mtime_override(args.mtime)
        .with_gzip_level(level)
        .with_zip_compression(compression)
}
