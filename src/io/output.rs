use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Destination for extracted files
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Create a single directory; an existing directory is not an error
    async fn create_dir_if_missing(&self, path: &Path) -> io::Result<()>;

    /// Create (or truncate) a file and write all of `data` to it
    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// Writes extracted files to the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOutput;

#[async_trait]
impl OutputSink for FsOutput {
    async fn create_dir_if_missing(&self, path: &Path) -> io::Result<()> {
        match fs::create_dir(path).await {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                match fs::metadata(path).await {
                    Ok(meta) if meta.is_dir() => Ok(()),
                    _ => Err(e),
                }
            }
            result => result,
        }
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn existing_directory_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("maps");

        FsOutput.create_dir_if_missing(&path).await.unwrap();
        FsOutput.create_dir_if_missing(&path).await.unwrap();
        assert!(fs::metadata(&path).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn file_in_the_way_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("maps");
        fs::write(&path, b"not a directory").await.unwrap();

        let err = FsOutput.create_dir_if_missing(&path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }
}
