//! # unfzfs
//!
//! An FZFS archive extractor with HTTP URL support using Range requests.
//!
//! FZFS archives store their metadata (file descriptors, names and chunk
//! offsets) as compressed tables after a region of independently compressed
//! data chunks. This library loads that metadata and rebuilds every file from
//! its chunks, reading the archive either from the local filesystem or from a
//! remote HTTP server.
//!
//! ## Features
//!
//! - Extract FZFS archives from the local filesystem
//! - Extract FZFS archives from HTTP/HTTPS URLs using Range requests
//! - Strict validation of headers, segments and chunk boundaries
//! - Nested paths recreated below the output directory
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use unfzfs::{FzfsExtractor, LocalFileReader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(LocalFileReader::new(Path::new("data.fzfs"))?);
//!
//!     // Load the archive index
//!     let extractor = FzfsExtractor::open(reader).await?;
//!
//!     // List all files in the archive
//!     for entry in extractor.list_files()? {
//!         println!("{}", entry.name);
//!     }
//!
//!     // Extract everything into the current directory
//!     extractor.extract_all(Path::new(".")).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod fzfs;
pub mod io;

pub use cli::Cli;
pub use fzfs::{ExtractSummary, FzfsEntry, FzfsExtractor};
pub use io::{FsOutput, HttpRangeReader, LocalFileReader, MemoryReader, OutputSink, ReadAt};
