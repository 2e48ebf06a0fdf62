//! Streaming content handles that must be released explicitly.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use braces_rs_core::{BracesError, BracesResult};

/// A content source read once and then released.
///
/// `release` consumes the handle, so a resource can be released at most once.
#[async_trait]
pub trait StreamingResource: Send {
    /// Reads the remaining content.
    async fn read_to_end(&mut self) -> BracesResult<Bytes>;

    /// Releases the underlying handle.
    async fn release(self: Box<Self>) -> BracesResult<()>;
}

/// Adapts any tokio reader into a [`StreamingResource`].
#[derive(Debug)]
pub struct ReaderResource<R> {
    reader: R,
    label: String,
}

impl<R> ReaderResource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Wraps `reader`. The label only appears in log events and errors.
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
        }
    }
}

/// A file opened for download.
pub type FileResource = ReaderResource<File>;

impl ReaderResource<File> {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::Io`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> BracesResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

#[async_trait]
impl<R> StreamingResource for ReaderResource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_to_end(&mut self) -> BracesResult<Bytes> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf).await.map_err(|e| {
            BracesError::Resource(format!("reading '{}' failed: {e}", self.label))
        })?;
        Ok(Bytes::from(buf))
    }

    async fn release(self: Box<Self>) -> BracesResult<()> {
        tracing::trace!(resource = %self.label, "released streaming resource");
        drop(self.reader);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_reader_resource() {
        let mut resource = ReaderResource::new(&b"hello"[..], "memory");
        assert_eq!(resource.read_to_end().await.unwrap(), Bytes::from_static(b"hello"));
        Box::new(resource).release().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_resource() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"id,title\n1,Docs\n").unwrap();

        let mut resource = FileResource::open(file.path()).await.unwrap();
        assert_eq!(
            resource.read_to_end().await.unwrap(),
            Bytes::from_static(b"id,title\n1,Docs\n")
        );
        Box::new(resource).release().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileResource::open(dir.path().join("missing.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, BracesError::Io(_)));
    }
}
