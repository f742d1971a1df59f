//! FZFS archive parsing and extraction.
//!
//! This module reads FZFS containers and rebuilds the files stored in them.
//!
//! ## Architecture
//!
//! The module is organized leaf-first:
//!
//! - [`decoder`]: one-shot zlib inflation of a single block into a buffer of known capacity
//! - [`segment`]: length-prefixed, compressed metadata tables
//! - [`index`]: the container header plus the descriptor, name and offset tables
//! - [`extractor`]: reconstruction of each file from its chunks and writing it out
//!
//! ## FZFS Format Overview
//!
//! An FZFS file consists of:
//! 1. An 8-byte header: magic `FZFS` and the size of the chunk-data region
//! 2. The chunk-data region: independently compressed pieces of file data
//! 3. Three metadata segments: file descriptors, names and chunk offsets
//!
//! A file is rebuilt by inflating consecutive chunks, starting at its first
//! chunk index, until its declared size is reached. Chunk boundaries come from
//! the offset table, which carries one trailing sentinel entry.
//!
//! ## Limitations
//!
//! - Only regular files (type 8) are extracted; other entries are skipped
//! - No archive creation

pub mod decoder;
mod error;
mod extractor;
mod index;
pub mod segment;
mod structures;

pub use error::{Error, ErrorKind, Result};
pub use extractor::{ExtractSummary, FzfsExtractor};
pub use index::{ArchiveIndex, Entries, NameCursor};
pub use structures::*;
