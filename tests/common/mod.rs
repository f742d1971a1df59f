//! Test-only FZFS archive builder.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

pub const MAGIC: &[u8; 4] = b"FZFS";
pub const REGULAR: u32 = 8;

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Raw descriptor fields, in on-disk order
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub name: u32,
    pub kind: u32,
    pub first_chunk_index: u32,
    pub total_size: u32,
    pub max_chunk_size: u32,
}

/// Builds archives the way a packer lays them out: chunk data first, then
/// the descriptor, name and offset segments.
pub struct ArchiveBuilder {
    pub chunk_size: usize,
    pub region: Vec<u8>,
    pub descriptors: Vec<Descriptor>,
    pub names: Vec<u8>,
    pub offsets: Vec<u32>,
}

impl ArchiveBuilder {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            region: Vec::new(),
            descriptors: Vec::new(),
            names: Vec::new(),
            offsets: Vec::new(),
        }
    }

    fn push_name(&mut self, name: &str) {
        self.names.extend_from_slice(name.as_bytes());
        self.names.push(0);
    }

    /// Append an already compressed chunk and return its index
    pub fn push_chunk(&mut self, compressed: &[u8]) -> u32 {
        self.offsets.push((8 + self.region.len()) as u32);
        self.region.extend_from_slice(compressed);
        (self.offsets.len() - 1) as u32
    }

    /// Add a regular file split into `chunk_size` pieces
    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        let first = self.offsets.len() as u32;
        for piece in data.chunks(self.chunk_size.max(1)) {
            self.push_chunk(&deflate(piece));
        }
        self.descriptors.push(Descriptor {
            name: 0,
            kind: REGULAR,
            first_chunk_index: first,
            total_size: data.len() as u32,
            max_chunk_size: self.chunk_size as u32,
        });
        self.push_name(name);
        self
    }

    /// Add a regular file from explicit chunk contents and declared sizes
    pub fn file_with_chunks(
        mut self,
        name: &str,
        chunks: &[&[u8]],
        total_size: u32,
        max_chunk_size: u32,
    ) -> Self {
        let first = self.offsets.len() as u32;
        for chunk in chunks {
            self.push_chunk(&deflate(chunk));
        }
        self.descriptors.push(Descriptor {
            name: 0,
            kind: REGULAR,
            first_chunk_index: first,
            total_size,
            max_chunk_size,
        });
        self.push_name(name);
        self
    }

    /// Add an entry of another type; it owns no chunks
    pub fn entry(mut self, name: &str, kind: u32) -> Self {
        self.descriptors.push(Descriptor {
            name: 0,
            kind,
            first_chunk_index: self.offsets.len() as u32,
            total_size: 0,
            max_chunk_size: 0,
        });
        self.push_name(name);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(self.region.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.region);

        let mut files = Vec::new();
        for d in &self.descriptors {
            for v in [d.name, d.kind, d.first_chunk_index, d.total_size, d.max_chunk_size] {
                files.extend_from_slice(&v.to_le_bytes());
            }
        }
        segment(&mut out, self.descriptors.len() as u32, 20, &files);

        segment(&mut out, self.names.len() as u32, 1, &self.names);

        let mut offsets = self.offsets.clone();
        offsets.push((8 + self.region.len()) as u32);
        let table: Vec<u8> = offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
        segment(&mut out, offsets.len() as u32, 4, &table);

        out
    }
}

pub fn segment(out: &mut Vec<u8>, item_count: u32, item_size: u32, payload: &[u8]) {
    let packed = deflate(payload);
    out.extend_from_slice(&(packed.len() as u32).to_le_bytes());
    out.extend_from_slice(&item_count.to_le_bytes());
    out.extend_from_slice(&item_size.to_le_bytes());
    out.extend_from_slice(&packed);
}
