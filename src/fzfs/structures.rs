use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::error::{Error, Result};

/// Kind of an entry as stored in its file descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Unknown(u32),
}

impl FileKind {
    pub fn from_u32(value: u32) -> Self {
        match value {
            8 => FileKind::Regular,
            _ => FileKind::Unknown(value),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            FileKind::Regular => 8,
            FileKind::Unknown(v) => *v,
        }
    }
}

/// Container header - 8 bytes at offset 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: u32,
    pub metadata_offset: u32,
}

impl ContainerHeader {
    /// "FZFS" read as a little-endian u32
    pub const MAGIC: u32 = 0x53465a46;
    pub const SIZE: usize = 8;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Truncated {
                what: "container header",
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != Self::MAGIC {
            return Err(Error::InvalidMagic { found: magic });
        }

        Ok(Self {
            magic,
            metadata_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Metadata segment framing - 12 bytes, followed by `compressed_size` bytes of payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub compressed_size: u32,
    pub item_count: u32,
    pub item_size: u32,
}

impl SegmentHeader {
    pub const SIZE: usize = 12;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Truncated {
                what: "segment header",
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        Ok(Self {
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            item_count: cursor.read_u32::<LittleEndian>()?,
            item_size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Number of bytes the payload must inflate to.
    ///
    /// Computed in 64 bits so hostile headers cannot wrap around.
    pub fn decoded_len(&self) -> u64 {
        self.item_count as u64 * self.item_size as u64
    }
}

/// File descriptor record - 20 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Stored by the packer but never read; names come from the name blob
    pub name_field: u32,
    pub kind: FileKind,
    pub first_chunk_index: u32,
    pub total_size: u32,
    pub max_chunk_size: u32,
}

impl FileDescriptor {
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Truncated {
                what: "file descriptor",
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        Ok(Self {
            name_field: cursor.read_u32::<LittleEndian>()?,
            kind: FileKind::from_u32(cursor.read_u32::<LittleEndian>()?),
            first_chunk_index: cursor.read_u32::<LittleEndian>()?,
            total_size: cursor.read_u32::<LittleEndian>()?,
            max_chunk_size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }
}

/// Parsed archive entry: a descriptor paired with its name from the name blob
#[derive(Debug, Clone)]
pub struct FzfsEntry {
    pub index: usize,
    pub name: String,
    pub descriptor: FileDescriptor,
}

impl FzfsEntry {
    pub fn is_regular(&self) -> bool {
        self.descriptor.is_regular()
    }

    pub fn size(&self) -> u64 {
        self.descriptor.total_size as u64
    }

    /// Split the stored name into path components.
    ///
    /// Archives are produced on Windows, so both `\` and `/` separate
    /// components. Names that could escape the output directory are rejected.
    pub fn components(&self) -> Result<Vec<&str>> {
        let unsafe_name = || Error::UnsafeName {
            name: self.name.clone(),
        };

        if self.name.is_empty() || self.name.starts_with(['\\', '/']) {
            return Err(unsafe_name());
        }

        let parts: Vec<&str> = self.name.split(['\\', '/']).collect();
        for part in &parts {
            if part.is_empty() || *part == "." || *part == ".." || part.contains(':') {
                return Err(unsafe_name());
            }
        }

        Ok(parts)
    }
}
