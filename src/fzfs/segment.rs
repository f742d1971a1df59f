//! Reading of length-prefixed, compressed metadata segments.

use crate::io::ReadAt;

use super::decoder::inflate_into;
use super::error::{Error, Result};
use super::structures::SegmentHeader;

/// Largest expansion DEFLATE can achieve on any input
const MAX_INFLATE_RATIO: u64 = 1032;

/// A fully decoded metadata segment
#[derive(Debug, Clone)]
pub struct Segment {
    pub header: SegmentHeader,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn item_count(&self) -> usize {
        self.header.item_count as usize
    }

    /// Require a fixed record size, as the descriptor and offset tables do
    pub fn expect_item_size(&self, segment: &'static str, expected: u32) -> Result<()> {
        if self.header.item_size != expected {
            return Err(Error::ItemSize {
                segment,
                expected,
                actual: self.header.item_size,
            });
        }
        Ok(())
    }

    /// Iterate over the fixed-size items of the segment
    pub fn items(&self) -> std::slice::ChunksExact<'_, u8> {
        // chunks_exact panics on zero, and a zero-sized item carries no data anyway
        self.data.chunks_exact(self.header.item_size.max(1) as usize)
    }
}

/// Allocate a zeroed buffer, reporting allocation failure instead of aborting
pub(crate) fn alloc_zeroed(len: u64) -> Result<Vec<u8>> {
    let size = usize::try_from(len).map_err(|_| Error::Allocation { bytes: len })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| Error::Allocation { bytes: len })?;
    buf.resize(size, 0);
    Ok(buf)
}

/// Read and decode the segment starting at `offset`.
///
/// The payload must inflate to exactly `item_count * item_size` bytes and use
/// up every compressed byte; anything else makes the metadata unusable.
///
/// Returns the segment and the offset just past it.
pub async fn read_segment<R: ReadAt + ?Sized>(
    reader: &R,
    offset: u64,
    segment: &'static str,
) -> Result<(Segment, u64)> {
    let mut header_buf = [0u8; SegmentHeader::SIZE];
    reader
        .read_exact_at(offset, &mut header_buf)
        .await
        .map_err(|e| Error::read(offset, SegmentHeader::SIZE, e))?;
    let header = SegmentHeader::from_bytes(&header_buf)?;

    let payload_offset = offset + SegmentHeader::SIZE as u64;
    let available = reader.size().saturating_sub(payload_offset);
    if header.compressed_size as u64 > available {
        return Err(Error::Truncated {
            what: segment,
            expected: header.compressed_size as usize,
            actual: available as usize,
        });
    }

    let expected = header.decoded_len();
    let compressed_size = header.compressed_size as u64;
    if expected > compressed_size.saturating_mul(MAX_INFLATE_RATIO) {
        return Err(Error::SegmentRatio {
            segment,
            expected,
            compressed: compressed_size,
        });
    }

    let mut compressed = alloc_zeroed(compressed_size)?;
    reader
        .read_exact_at(payload_offset, &mut compressed)
        .await
        .map_err(|e| Error::read(payload_offset, compressed.len(), e))?;

    // One spare byte so an overlong payload shows up as a size mismatch
    let mut data = alloc_zeroed(expected + 1)?;
    let inflated = inflate_into(&compressed, &mut data)
        .map_err(|source| Error::SegmentInflate { segment, source })?;

    if inflated.consumed != compressed.len() {
        return Err(Error::SegmentTrailing {
            segment,
            trailing: (compressed.len() - inflated.consumed) as u64,
        });
    }
    if inflated.written as u64 != expected {
        return Err(Error::SegmentSize {
            segment,
            expected,
            actual: inflated.written as u64,
        });
    }
    data.truncate(inflated.written);

    tracing::debug!(
        segment,
        offset,
        compressed = header.compressed_size,
        items = header.item_count,
        item_size = header.item_size,
        "Decoded segment"
    );

    Ok((Segment { header, data }, payload_offset + header.compressed_size as u64))
}
