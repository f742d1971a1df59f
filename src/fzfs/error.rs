use std::path::PathBuf;

use super::decoder::InflateError;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive layout or its metadata is malformed
    Format,
    /// A read, write or allocation failed
    Io,
    /// File data does not reconstruct to its declared size
    Corruption,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Archive is {size} bytes, too small to be a valid FZFS archive")]
    TooSmall { size: u64 },

    #[error("Not a valid FZFS archive (magic {found:#010x})")]
    InvalidMagic { found: u32 },

    #[error("Truncated {what}: expected {expected} bytes, got {actual}")]
    Truncated {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed record")]
    Record(#[from] std::io::Error),

    #[error("Unexpected item size {actual} in {segment} segment (expected {expected})")]
    ItemSize {
        segment: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("Cannot inflate {segment} segment")]
    SegmentInflate {
        segment: &'static str,
        #[source]
        source: InflateError,
    },

    #[error("{segment} segment has {trailing} unused compressed bytes")]
    SegmentTrailing { segment: &'static str, trailing: u64 },

    #[error("Size mismatch in {segment} segment: expected {expected} bytes, got {actual}")]
    SegmentSize {
        segment: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("{segment} segment claims {expected} bytes from only {compressed} compressed bytes")]
    SegmentRatio {
        segment: &'static str,
        expected: u64,
        compressed: u64,
    },

    #[error("Name blob has no terminated name at offset {offset}")]
    NameOutOfRange { offset: usize },

    #[error("Entry `{name}` has unsupported type {kind:#x}")]
    Unsupported { name: String, kind: u32 },

    #[error("Refusing to extract unsafe name `{name}`")]
    UnsafeName { name: String },

    #[error("Entry {index} starts at chunk {first}, not after the previous entry's chunk {previous}")]
    ChunkOrder {
        index: usize,
        first: u32,
        previous: u32,
    },

    #[error("Chunk {chunk} is outside the offset table ({entries} entries)")]
    ChunkOutOfRange { chunk: u64, entries: usize },

    #[error("Chunk {chunk} has descending offsets {start}..{end}")]
    ChunkBounds { chunk: u64, start: u32, end: u32 },

    #[error("Cannot inflate chunk {chunk}")]
    ChunkInflate {
        chunk: u64,
        #[source]
        source: InflateError,
    },

    #[error("Chunk {chunk} written at offset {offset} overruns the file size {total}")]
    ChunkOverrun { chunk: u64, offset: u64, total: u64 },

    #[error("Chunk {chunk} belongs to another entry (this entry's chunks end at {limit})")]
    ChunkOverlap { chunk: u64, limit: u64 },

    #[error("Cannot read {len} bytes at offset {offset}")]
    Read {
        offset: u64,
        len: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Cannot allocate {bytes} bytes")]
    Allocation { bytes: u64 },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write file `{}`", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to unpack `{name}` after {extracted} file(s)")]
    Unpack {
        name: String,
        extracted: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooSmall { .. }
            | Error::InvalidMagic { .. }
            | Error::Truncated { .. }
            | Error::Record(_)
            | Error::ItemSize { .. }
            | Error::SegmentInflate { .. }
            | Error::SegmentTrailing { .. }
            | Error::SegmentSize { .. }
            | Error::SegmentRatio { .. }
            | Error::NameOutOfRange { .. }
            | Error::Unsupported { .. }
            | Error::UnsafeName { .. }
            | Error::ChunkOrder { .. } => ErrorKind::Format,

            Error::ChunkOutOfRange { .. }
            | Error::ChunkBounds { .. }
            | Error::ChunkInflate { .. }
            | Error::ChunkOverrun { .. }
            | Error::ChunkOverlap { .. } => ErrorKind::Corruption,

            Error::Read { .. }
            | Error::Allocation { .. }
            | Error::CreateDirectory { .. }
            | Error::WriteFile { .. } => ErrorKind::Io,

            Error::Unpack { source, .. } => source.kind(),
        }
    }

    pub(crate) fn read(offset: u64, len: usize, source: anyhow::Error) -> Self {
        Error::Read {
            offset,
            len,
            source: source.into(),
        }
    }
}
