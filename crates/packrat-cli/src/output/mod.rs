//! Result rendering for the terminal: colored text or JSON.

mod formatter;
mod human;
mod json;

pub use formatter::OutputFormatter;

/// Picks the formatter for the global `--json`, `--verbose` and `--quiet` flags.
pub fn create_formatter(json: bool, verbose: bool, quiet: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(json::JsonFormatter)
    } else {
        Box::new(human::HumanFormatter::new(verbose, quiet))
    }
}
