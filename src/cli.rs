use clap::Parser;
use std::path::PathBuf;

/// Exit status for missing or malformed arguments
pub const EXIT_BAD_ARGUMENTS: u8 = 2;
/// Exit status when the archive cannot be opened or is too small
pub const EXIT_INVALID_FILE: u8 = 3;
/// Exit status when the output directory does not exist
pub const EXIT_NO_DIRECTORY: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "unfzfs")]
#[command(version)]
#[command(about = "An FZFS archive extractor with HTTP URL support", long_about = None)]
#[command(after_help = "Examples:\n  \
  unfzfs data.fzfs                extract data.fzfs into the current directory\n  \
  unfzfs data.fzfs out            extract data.fzfs into the existing directory out\n  \
  unfzfs -l https://example.com/data.fzfs   list files from remote archive")]
pub struct Cli {
    /// FZFS archive path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Directory to extract into (default: current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_list(&self) -> bool {
        self.list || self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_filter(&self) -> &'static str {
        if self.is_very_quiet() {
            "error"
        } else if self.is_quiet() {
            "warn"
        } else {
            "info"
        }
    }
}
