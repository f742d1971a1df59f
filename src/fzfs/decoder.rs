//! One-shot zlib inflation of a single independently compressed block.
//!
//! Both chunk data and metadata segments are stored as complete zlib streams,
//! each of which must inflate in a single call into a buffer whose capacity is
//! known up front. Nothing is ever streamed across calls.

use flate2::{Decompress, DecompressError, FlushDecompress, Status};

#[derive(Debug, thiserror::Error)]
pub enum InflateError {
    #[error("malformed compressed data")]
    Malformed(#[source] DecompressError),

    #[error("compressed data ended early ({consumed} of {available} bytes consumed)")]
    Truncated { consumed: u64, available: usize },

    #[error("output exceeds capacity of {capacity} bytes")]
    CapacityExceeded { capacity: usize },
}

/// Outcome of a successful inflation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflated {
    /// Bytes written to the front of the output buffer
    pub written: usize,
    /// Compressed bytes consumed, including the zlib trailer
    pub consumed: usize,
}

/// Inflate `input` into `output` in one pass.
///
/// Succeeds only when the stream reaches its end-of-stream marker. The output
/// does not have to be filled: `written` is the true decompressed length.
pub fn inflate_into(input: &[u8], output: &mut [u8]) -> Result<Inflated, InflateError> {
    let mut inflater = Decompress::new(true);
    let status = inflater
        .decompress(input, output, FlushDecompress::Finish)
        .map_err(InflateError::Malformed)?;

    let written = inflater.total_out() as usize;
    let consumed = inflater.total_in();

    match status {
        Status::StreamEnd => Ok(Inflated {
            written,
            consumed: consumed as usize,
        }),
        // A full buffer alone does not tell a long stream from a cut one
        Status::Ok | Status::BufError if written == output.len() => {
            finish_full_buffer(&mut inflater, &input[consumed as usize..], output.len())
                .map(|consumed| Inflated { written, consumed })
        }
        Status::Ok | Status::BufError => Err(InflateError::Truncated {
            consumed,
            available: input.len(),
        }),
    }
}

/// Continue a stream that filled its buffer into a single spare byte.
///
/// Any further output means the capacity was too small. Otherwise the stream
/// either ends cleanly, so the data fit exactly, or the input stopped short.
fn finish_full_buffer(
    inflater: &mut Decompress,
    rest: &[u8],
    capacity: usize,
) -> Result<usize, InflateError> {
    let before_out = inflater.total_out();
    let before_in = inflater.total_in();
    let mut spare = [0u8; 1];

    let status = inflater
        .decompress(rest, &mut spare, FlushDecompress::Finish)
        .map_err(InflateError::Malformed)?;

    if inflater.total_out() > before_out {
        return Err(InflateError::CapacityExceeded { capacity });
    }
    match status {
        Status::StreamEnd => Ok(inflater.total_in() as usize),
        Status::Ok | Status::BufError => Err(InflateError::Truncated {
            consumed: inflater.total_in(),
            available: (before_in as usize) + rest.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflates_exact_capacity() {
        let packed = deflate(b"hello");
        let mut out = [0u8; 5];

        let inflated = inflate_into(&packed, &mut out).unwrap();
        assert_eq!(inflated.written, 5);
        assert_eq!(inflated.consumed, packed.len());
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn reports_true_length_below_capacity() {
        let packed = deflate(b"abc");
        let mut out = [0u8; 64];

        let inflated = inflate_into(&packed, &mut out).unwrap();
        assert_eq!(inflated.written, 3);
        assert_eq!(&out[..3], b"abc");
    }

    #[test]
    fn rejects_output_over_capacity() {
        let packed = deflate(&[7u8; 100]);
        let mut out = [0u8; 99];

        let err = inflate_into(&packed, &mut out).unwrap_err();
        assert!(matches!(err, InflateError::CapacityExceeded { capacity: 99 }));
    }

    #[test]
    fn rejects_truncated_stream() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let packed = deflate(&data);
        let mut out = vec![0u8; data.len()];

        let err = inflate_into(&packed[..packed.len() / 2], &mut out).unwrap_err();
        assert!(matches!(err, InflateError::Truncated { .. }), "{err:?}");
    }

    #[test]
    fn cut_stream_filling_the_buffer_is_truncated() {
        // Dropping the adler32 trailer leaves every data byte intact
        let packed = deflate(b"hello");
        let cut = &packed[..packed.len() - 4];

        let mut exact = [0u8; 5];
        let err = inflate_into(cut, &mut exact).unwrap_err();
        assert!(matches!(err, InflateError::Truncated { .. }), "{err:?}");

        let mut roomy = [0u8; 64];
        let err = inflate_into(cut, &mut roomy).unwrap_err();
        assert!(matches!(err, InflateError::Truncated { .. }), "{err:?}");
    }

    #[test]
    fn rejects_output_one_byte_over_capacity() {
        let packed = deflate(b"hello!");
        let mut out = [0u8; 5];

        let err = inflate_into(&packed, &mut out).unwrap_err();
        assert!(matches!(err, InflateError::CapacityExceeded { capacity: 5 }), "{err:?}");
    }

    #[test]
    fn rejects_garbage() {
        let mut out = [0u8; 16];
        let err = inflate_into(b"definitely not zlib", &mut out).unwrap_err();
        assert!(matches!(err, InflateError::Malformed(_)), "{err:?}");
    }

    #[test]
    fn empty_stream_inflates_to_nothing() {
        let packed = deflate(b"");
        let mut out = [0u8; 1];

        let inflated = inflate_into(&packed, &mut out).unwrap();
        assert_eq!(inflated.written, 0);
    }

    #[test]
    fn reports_consumed_input_when_followed_by_padding() {
        let mut packed = deflate(b"hello");
        let len = packed.len();
        packed.extend_from_slice(&[0, 0, 0]);
        let mut out = [0u8; 5];

        let inflated = inflate_into(&packed, &mut out).unwrap();
        assert_eq!(inflated.consumed, len);
    }
}
