//! Archive index: the header and the three metadata tables of an archive.
//!
//! ## Layout
//!
//! ```text
//! +----------------+  0
//! | magic, offset  |  container header (8 bytes)
//! +----------------+  8
//! | chunk data     |  `metadata_offset` bytes, reached only through offsets
//! +----------------+  8 + metadata_offset
//! | descriptors    |  segment of 20-byte records
//! | names          |  segment of NUL-terminated names
//! | offsets        |  segment of u32 absolute chunk boundaries
//! +----------------+
//! ```

use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

use crate::io::ReadAt;

use super::error::{Error, Result};
use super::segment::read_segment;
use super::structures::{ContainerHeader, FileDescriptor, FzfsEntry};

/// Decoded metadata of an FZFS archive.
///
/// Built once per run by [`ArchiveIndex::load`] and dropped with the run.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    header: ContainerHeader,
    descriptors: Vec<FileDescriptor>,
    names: Vec<u8>,
    offsets: Vec<u32>,
    /// Exclusive chunk bound per descriptor: the first chunk of the next
    /// non-empty regular file, or the offset table's sentinel
    chunk_limits: Vec<u64>,
}

impl ArchiveIndex {
    /// Read the header and all three metadata segments.
    ///
    /// # Errors
    ///
    /// Fails on a bad magic before any segment is read. Any segment failure
    /// is fatal: a partially decoded index is never returned.
    pub async fn load<R: ReadAt + ?Sized>(reader: &R) -> Result<Self> {
        let size = reader.size();
        if size <= ContainerHeader::SIZE as u64 {
            return Err(Error::TooSmall { size });
        }

        let mut buf = [0u8; ContainerHeader::SIZE];
        reader
            .read_exact_at(0, &mut buf)
            .await
            .map_err(|e| Error::read(0, ContainerHeader::SIZE, e))?;
        let header = ContainerHeader::from_bytes(&buf)?;

        // Chunk data sits between the header and the metadata
        let offset = ContainerHeader::SIZE as u64 + header.metadata_offset as u64;
        tracing::debug!(metadata_offset = header.metadata_offset, "Read container header");

        let (files, offset) = read_segment(reader, offset, "files").await?;
        files.expect_item_size("files", FileDescriptor::SIZE as u32)?;
        let descriptors = files
            .items()
            .map(FileDescriptor::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        let (names, offset) = read_segment(reader, offset, "names").await?;

        let (offsets, _) = read_segment(reader, offset, "offsets").await?;
        offsets.expect_item_size("offsets", 4)?;
        let offsets = offsets.items().map(LittleEndian::read_u32).collect();

        Self::from_tables(header, descriptors, names.data, offsets)
    }

    fn from_tables(
        header: ContainerHeader,
        descriptors: Vec<FileDescriptor>,
        names: Vec<u8>,
        offsets: Vec<u32>,
    ) -> Result<Self> {
        check_chunk_order(&descriptors)?;

        let mut chunk_limits = vec![0; descriptors.len()];
        let mut limit = offsets.len().saturating_sub(1) as u64;
        for (desc, slot) in descriptors.iter().zip(chunk_limits.iter_mut()).rev() {
            *slot = limit;
            if uses_chunks(desc) {
                limit = desc.first_chunk_index as u64;
            }
        }

        Ok(Self {
            header,
            descriptors,
            names,
            offsets,
            chunk_limits,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn descriptors(&self) -> &[FileDescriptor] {
        &self.descriptors
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Walk descriptors in order, pairing each with its name.
    ///
    /// The name cursor moves past one name per descriptor whatever its kind,
    /// so names stay aligned with descriptors when unsupported entries are
    /// present.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            descriptors: self.descriptors.iter().enumerate(),
            names: NameCursor::new(&self.names),
        }
    }

    /// First chunk index past the chunks available to descriptor `index`
    pub fn chunk_limit(&self, index: usize) -> u64 {
        self.chunk_limits.get(index).copied().unwrap_or(0)
    }

    /// Byte range of `chunk` in the container
    pub fn chunk_span(&self, chunk: u64) -> Result<Range<u64>> {
        let entries = self.offsets.len();
        let i = usize::try_from(chunk)
            .ok()
            .filter(|i| *i < entries.saturating_sub(1))
            .ok_or(Error::ChunkOutOfRange { chunk, entries })?;

        let (start, end) = (self.offsets[i], self.offsets[i + 1]);
        if end < start {
            return Err(Error::ChunkBounds { chunk, start, end });
        }

        Ok(start as u64..end as u64)
    }
}

fn uses_chunks(desc: &FileDescriptor) -> bool {
    desc.is_regular() && desc.total_size > 0
}

/// Files holding data must claim chunks in strictly ascending order.
///
/// Empty files use no chunks, so their start index is not checked.
fn check_chunk_order(descriptors: &[FileDescriptor]) -> Result<()> {
    let mut previous: Option<u32> = None;
    for (index, desc) in descriptors.iter().enumerate() {
        if !uses_chunks(desc) {
            continue;
        }
        if let Some(previous) = previous.filter(|p| desc.first_chunk_index <= *p) {
            return Err(Error::ChunkOrder {
                index,
                first: desc.first_chunk_index,
                previous,
            });
        }
        previous = Some(desc.first_chunk_index);
    }
    Ok(())
}

/// Sequential reader over the NUL-terminated names of the name blob
#[derive(Debug, Clone)]
pub struct NameCursor<'a> {
    blob: &'a [u8],
    pos: usize,
}

impl<'a> NameCursor<'a> {
    pub fn new(blob: &'a [u8]) -> Self {
        Self { blob, pos: 0 }
    }

    /// Return the name at the cursor and move past its terminator
    pub fn next_name(&mut self) -> Result<String> {
        let rest = self
            .blob
            .get(self.pos..)
            .ok_or(Error::NameOutOfRange { offset: self.pos })?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::NameOutOfRange { offset: self.pos })?;

        // Lossy conversion keeps non-UTF8 names usable
        let name = String::from_utf8_lossy(&rest[..len]).to_string();
        self.pos += len + 1;

        Ok(name)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Iterator returned by [`ArchiveIndex::entries`]
pub struct Entries<'a> {
    descriptors: std::iter::Enumerate<std::slice::Iter<'a, FileDescriptor>>,
    names: NameCursor<'a>,
}

impl Iterator for Entries<'_> {
    type Item = Result<FzfsEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, descriptor) = self.descriptors.next()?;
        Some(self.names.next_name().map(|name| FzfsEntry {
            index,
            name,
            descriptor: *descriptor,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.descriptors.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fzfs::FileKind;

    #[test]
    fn name_cursor_walks_blob() {
        let mut cursor = NameCursor::new(b"a.txt\0dir\\b.bin\0\0");

        assert_eq!(cursor.next_name().unwrap(), "a.txt");
        assert_eq!(cursor.next_name().unwrap(), "dir\\b.bin");
        assert_eq!(cursor.next_name().unwrap(), "");
        assert_eq!(cursor.position(), 17);
        assert!(matches!(
            cursor.next_name(),
            Err(Error::NameOutOfRange { offset: 17 })
        ));
    }

    #[test]
    fn name_cursor_needs_terminator() {
        let mut cursor = NameCursor::new(b"a.txt\0open");

        cursor.next_name().unwrap();
        assert!(matches!(
            cursor.next_name(),
            Err(Error::NameOutOfRange { offset: 6 })
        ));
    }

    const HEADER: ContainerHeader = ContainerHeader {
        magic: ContainerHeader::MAGIC,
        metadata_offset: 0,
    };

    fn index(offsets: Vec<u32>) -> ArchiveIndex {
        ArchiveIndex::from_tables(HEADER, Vec::new(), Vec::new(), offsets).unwrap()
    }

    fn file(kind: u32, first_chunk_index: u32, total_size: u32) -> FileDescriptor {
        FileDescriptor {
            name_field: 0,
            kind: FileKind::from_u32(kind),
            first_chunk_index,
            total_size,
            max_chunk_size: 16,
        }
    }

    #[test]
    fn chunk_limits_stop_at_next_file_with_data() {
        let descriptors = vec![
            file(8, 0, 40),
            file(8, 3, 0),
            file(4, 0, 99),
            file(8, 3, 10),
            file(8, 4, 10),
        ];
        let index = ArchiveIndex::from_tables(HEADER, descriptors, Vec::new(), vec![0; 6]).unwrap();

        assert_eq!(index.chunk_limit(0), 3);
        assert_eq!(index.chunk_limit(1), 3);
        assert_eq!(index.chunk_limit(2), 3);
        assert_eq!(index.chunk_limit(3), 4);
        assert_eq!(index.chunk_limit(4), 5);
        assert_eq!(index.chunk_limit(5), 0);
    }

    #[test]
    fn shared_first_chunk_is_rejected() {
        let descriptors = vec![file(8, 2, 10), file(8, 2, 10)];
        let err = ArchiveIndex::from_tables(HEADER, descriptors, Vec::new(), vec![0; 4]).unwrap_err();
        assert!(matches!(
            err,
            Error::ChunkOrder { index: 1, first: 2, previous: 2 }
        ));
    }

    #[test]
    fn descending_first_chunk_is_rejected() {
        let descriptors = vec![file(8, 5, 10), file(8, 0, 0), file(8, 1, 10)];
        let err = ArchiveIndex::from_tables(HEADER, descriptors, Vec::new(), vec![0; 8]).unwrap_err();
        assert!(matches!(err, Error::ChunkOrder { index: 2, .. }), "{err}");
        assert_eq!(err.kind(), crate::fzfs::ErrorKind::Format);
    }

    #[test]
    fn chunk_span_uses_sentinel() {
        let index = index(vec![8, 20, 35]);

        assert_eq!(index.chunk_span(0).unwrap(), 8..20);
        assert_eq!(index.chunk_span(1).unwrap(), 20..35);
        assert!(matches!(
            index.chunk_span(2),
            Err(Error::ChunkOutOfRange { chunk: 2, entries: 3 })
        ));
    }

    #[test]
    fn chunk_span_rejects_descending_offsets() {
        let index = index(vec![30, 20]);
        assert!(matches!(index.chunk_span(0), Err(Error::ChunkBounds { .. })));
    }

    #[test]
    fn chunk_span_on_empty_table() {
        let index = index(Vec::new());
        assert!(matches!(
            index.chunk_span(0),
            Err(Error::ChunkOutOfRange { entries: 0, .. })
        ));
    }
}
