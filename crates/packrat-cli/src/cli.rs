//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use packrat_core::types::ArchiveFormat;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "packrat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new archive
    Create(CreateArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(Debug, clap::Args)]
pub struct CreateArgs {
    /// Output archive file path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Source files or directories to archive, in archive order
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Archive format (default: detected from the output extension)
    #[arg(long, value_name = "FORMAT", value_parser = parse_format)]
    pub format: Option<ArchiveFormat>,

    /// Deflate zip entries instead of storing them
    #[arg(long)]
    pub deflate: bool,

    /// Compression level (1-9) for gzip and zip deflate
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u32).range(1..=9))]
    pub level: Option<u32>,

    /// Exclude pattern (name, *suffix or prefix*; can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Record default permissions instead of the filesystem's
    #[arg(long)]
    pub no_permissions: bool,

    /// Use this modification time (seconds since the Unix epoch) for every entry
    #[arg(long, value_name = "SECONDS")]
    pub mtime: Option<u64>,

    /// Cancel the build after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Overwrite output file if exists
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(Debug, clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_format(s: &str) -> Result<ArchiveFormat, String> {
    s.parse::<ArchiveFormat>()
        .map_err(|_| format!("unsupported format '{s}' (expected tar, tar.gz or zip)"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("tar").unwrap(), ArchiveFormat::Tar);
        assert_eq!(parse_format("tgz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(parse_format("zip").unwrap(), ArchiveFormat::Zip);
        assert!(parse_format("rar").unwrap_err().contains("rar"));
    }

    #[test]
    fn test_create_args() {
        let cli = Cli::try_parse_from([
            "packrat", "create", "out.zip", "a", "b", "--deflate", "-l", "9", "-x", "*.tmp",
            "--mtime", "0",
        ])
        .unwrap();

        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.sources, [PathBuf::from("a"), PathBuf::from("b")]);
        assert!(args.deflate);
        assert_eq!(args.level, Some(9));
        assert_eq!(args.exclude, ["*.tmp"]);
        assert_eq!(args.mtime, Some(0));
    }

    #[test]
    fn test_level_out_of_range_rejected() {
        let result = Cli::try_parse_from(["packrat", "create", "out.tar.gz", "src", "-l", "10"]);
        assert!(result.is_err());
    }
}
