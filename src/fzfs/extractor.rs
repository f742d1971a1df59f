use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::io::{FsOutput, OutputSink, ReadAt};

use super::decoder::{InflateError, inflate_into};
use super::error::{Error, Result};
use super::index::ArchiveIndex;
use super::segment::alloc_zeroed;
use super::structures::FzfsEntry;

/// Outcome of a completed [`FzfsExtractor::extract_all`] run
#[derive(Debug, Default)]
pub struct ExtractSummary {
    /// Output paths in descriptor order
    pub extracted: Vec<PathBuf>,
    /// Entries skipped because of an unsupported type
    pub skipped: Vec<FzfsEntry>,
}

/// FZFS archive extractor
pub struct FzfsExtractor<R: ReadAt, O: OutputSink = FsOutput> {
    reader: Arc<R>,
    index: ArchiveIndex,
    output: O,
}

impl<R: ReadAt> FzfsExtractor<R> {
    /// Load the archive index, writing extracted files to the local filesystem
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        Self::with_output(reader, FsOutput).await
    }
}

impl<R: ReadAt, O: OutputSink> FzfsExtractor<R, O> {
    pub async fn with_output(reader: Arc<R>, output: O) -> Result<Self> {
        let index = ArchiveIndex::load(reader.as_ref()).await?;
        Ok(Self {
            reader,
            index,
            output,
        })
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// List all entries in the archive, supported or not
    pub fn list_files(&self) -> Result<Vec<FzfsEntry>> {
        self.index.entries().collect()
    }

    /// Reassemble a file's data from its chunks.
    ///
    /// Chunks are consumed from `first_chunk_index` until exactly
    /// `total_size` bytes are produced. Each chunk inflates to at most
    /// `max_chunk_size` bytes; its true length is the advance.
    pub async fn extract_to_memory(&self, entry: &FzfsEntry) -> Result<Vec<u8>> {
        if !entry.is_regular() {
            return Err(Error::Unsupported {
                name: entry.name.clone(),
                kind: entry.descriptor.kind.as_u32(),
            });
        }

        let desc = &entry.descriptor;
        let total = desc.total_size as u64;
        let max_chunk = desc.max_chunk_size as usize;
        let limit = self.index.chunk_limit(entry.index);

        let mut data = alloc_zeroed(total)?;
        let mut offset = 0usize;
        let mut chunk = desc.first_chunk_index as u64;

        while offset < data.len() {
            if chunk >= limit {
                return Err(Error::ChunkOverlap { chunk, limit });
            }

            let span = self.index.chunk_span(chunk)?;
            let mut raw = alloc_zeroed(span.end - span.start)?;
            self.reader
                .read_exact_at(span.start, &mut raw)
                .await
                .map_err(|e| Error::read(span.start, raw.len(), e))?;

            // Never hand the decoder more room than the file has left
            let remaining = data.len() - offset;
            let capacity = max_chunk.min(remaining);
            let inflated = match inflate_into(&raw, &mut data[offset..offset + capacity]) {
                Ok(inflated) => inflated,
                Err(InflateError::CapacityExceeded { .. }) if remaining < max_chunk => {
                    return Err(Error::ChunkOverrun {
                        chunk,
                        offset: offset as u64,
                        total,
                    });
                }
                Err(source) => return Err(Error::ChunkInflate { chunk, source }),
            };

            tracing::debug!(
                chunk,
                offset,
                compressed = raw.len(),
                written = inflated.written,
                "Inflated chunk"
            );

            offset += inflated.written;
            chunk += 1;
        }

        Ok(data)
    }

    /// Extract a single file below `dir`, creating intermediate directories.
    ///
    /// The file is only created once its data is fully reconstructed.
    pub async fn extract_to_file(&self, entry: &FzfsEntry, dir: &Path) -> Result<PathBuf> {
        let components = entry.components()?;
        let Some((file_name, parents)) = components.split_last() else {
            return Err(Error::UnsafeName {
                name: entry.name.clone(),
            });
        };

        let mut path = dir.to_path_buf();
        for part in parents {
            path.push(part);
            self.output
                .create_dir_if_missing(&path)
                .await
                .map_err(|source| Error::CreateDirectory {
                    path: path.clone(),
                    source,
                })?;
        }
        path.push(file_name);

        let data = self.extract_to_memory(entry).await?;

        self.output
            .write_file(&path, &data)
            .await
            .map_err(|source| Error::WriteFile {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Extract every regular file below `dir`, in descriptor order.
    ///
    /// Entries of unsupported types are logged and skipped. The first file
    /// that fails stops the run; the error records how many files were
    /// written before it.
    pub async fn extract_all(&self, dir: &Path) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();

        for (index, entry) in self.index.entries().enumerate() {
            let entry = entry.map_err(|source| Error::Unpack {
                name: format!("#{index}"),
                extracted: summary.extracted.len(),
                source: Box::new(source),
            })?;

            if !entry.is_regular() {
                tracing::warn!(
                    "Skipping unsupported file {} with type {:#x}",
                    entry.name,
                    entry.descriptor.kind.as_u32()
                );
                summary.skipped.push(entry);
                continue;
            }

            tracing::info!(size = entry.size(), "Unpacking {}", entry.name);

            match self.extract_to_file(&entry, dir).await {
                Ok(path) => summary.extracted.push(path),
                Err(source) => {
                    return Err(Error::Unpack {
                        name: entry.name,
                        extracted: summary.extracted.len(),
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(summary)
    }
}
