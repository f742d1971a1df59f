//! Main entry point for the unfzfs CLI application.
//!
//! This binary extracts FZFS archives from the local filesystem or from
//! remote HTTP URLs.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use unfzfs::cli::{EXIT_BAD_ARGUMENTS, EXIT_INVALID_FILE, EXIT_NO_DIRECTORY};
use unfzfs::fzfs::{Error, FzfsExtractor};
use unfzfs::{Cli, HttpRangeReader, LocalFileReader, ReadAt};

/// Application entry point.
///
/// Argument errors, an unreadable archive and a missing output directory
/// each have their own exit status. Once extraction starts the run always
/// ends with success, whether or not every file could be unpacked.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_BAD_ARGUMENTS)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_INVALID_FILE)
        }
    }
}

/// Open the archive source and dispatch to [`process_fzfs`].
async fn run(cli: &Cli) -> Result<ExitCode> {
    if cli.is_http_url() {
        // Handle remote archive via HTTP Range requests
        let reader = HttpRangeReader::new(cli.file.clone())
            .await
            .with_context(|| format!("Unable to open file {}", cli.file))?;
        let reader = Arc::new(reader);

        let code = process_fzfs(reader.clone(), cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
        Ok(code)
    } else {
        let reader = LocalFileReader::new(Path::new(&cli.file))
            .with_context(|| format!("Unable to open file {}", cli.file))?;
        process_fzfs(Arc::new(reader), cli).await
    }
}

/// Process an FZFS archive based on CLI options.
///
/// # Returns
///
/// The exit status of the run. Failures inside the archive are logged and
/// do not change it.
async fn process_fzfs<R: ReadAt + 'static>(reader: Arc<R>, cli: &Cli) -> Result<ExitCode> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Unable to resolve current directory")?,
    };

    if !cli.is_list() && !dir.is_dir() {
        tracing::error!("Directory {} does not exist.", dir.display());
        return Ok(ExitCode::from(EXIT_NO_DIRECTORY));
    }

    let extractor = match FzfsExtractor::open(reader).await {
        Ok(extractor) => extractor,
        Err(e @ Error::TooSmall { .. }) => {
            tracing::error!("File {} is not a valid FZFS archive file: {}", cli.file, e);
            return Ok(ExitCode::from(EXIT_INVALID_FILE));
        }
        Err(e) => {
            tracing::error!("Unable to read file {}: {:#}", cli.file, anyhow::Error::new(e));
            return Ok(ExitCode::SUCCESS);
        }
    };

    if cli.is_list() {
        if let Err(e) = list_files(&extractor, cli.verbose) {
            tracing::error!("Unable to list file {}: {:#}", cli.file, anyhow::Error::new(e));
        }
        return Ok(ExitCode::SUCCESS);
    }

    match extractor.extract_all(&dir).await {
        Ok(summary) => tracing::info!(
            "Extracted {} file(s), skipped {}",
            summary.extracted.len(),
            summary.skipped.len()
        ),
        Err(e) => tracing::error!("{:#}", anyhow::Error::new(e)),
    }

    Ok(ExitCode::SUCCESS)
}

/// List entries in the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Table with size, type and first chunk
fn list_files<R: ReadAt>(extractor: &FzfsExtractor<R>, verbose: bool) -> unfzfs::fzfs::Result<()> {
    let entries = extractor.list_files()?;

    if verbose {
        println!("{:>10}  {:>6}  {:>8}  Name", "Length", "Type", "Chunk");
        println!("{}", "-".repeat(50));
    }

    let mut total = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if verbose {
            println!(
                "{:>10}  {:>#6x}  {:>8}  {}",
                entry.size(),
                entry.descriptor.kind.as_u32(),
                entry.descriptor.first_chunk_index,
                entry.name
            );

            if entry.is_regular() {
                total += entry.size();
                file_count += 1;
            }
        } else {
            println!("{}", entry.name);
        }
    }

    if verbose {
        println!("{}", "-".repeat(50));
        println!("{:>10}  {:>18}  {} files", total, "", file_count);
    }

    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
