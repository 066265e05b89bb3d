//! Remote protocol client abstraction
//!
//! Workers only talk to the server through [`RemoteClient`]; each one gets
//! its own session from a [`Connector`].

pub mod memory;
pub mod webdav;

use crate::config::TransferSettings;
use crate::types::{RemoteError, SyncError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;

pub use memory::MemoryConnector;
pub use webdav::WebDavConnector;

/// Streamed file content
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// What a remote stat returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    /// Plain file with the server's content tag, if it sent one
    File { etag: Option<String> },
    Directory,
    /// Anything the server reports that is neither a file nor a collection
    Other,
}

/// One persistent remote session
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn stat(&self, path: &str) -> Result<RemoteEntry, RemoteError>;

    /// Names of the direct children of a directory
    async fn list_dir(&self, path: &str) -> Result<Vec<String>, RemoteError>;

    /// Create a directory and all missing parents; existing ones are fine
    async fn create_dir_all(&self, path: &str) -> Result<(), RemoteError>;

    async fn read_stream(&self, path: &str) -> Result<ByteStream, RemoteError>;

    async fn write_stream(&self, path: &str, stream: ByteStream) -> Result<(), RemoteError>;
}

/// Builds one session per call from shared settings
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &TransferSettings) -> Result<Box<dyn RemoteClient>, SyncError>;
}

/// Normalize a remote path to `/`-separated, absolute, without trailing slash
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path
        .split(|c: char| c == '/' || c == '\\')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    format!("/{}", parts.join("/"))
}

/// Parent directory of a normalized remote path (`/` for top-level entries)
pub fn parent_path(path: &str) -> String {
    let path = normalize_path(path);
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/dst/a/"), "/dst/a");
        assert_eq!(normalize_path("dst//a"), "/dst/a");
        assert_eq!(normalize_path("\\dst\\a"), "/dst/a");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/./a"), "/a");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/dst/a/f1.txt"), "/dst/a");
        assert_eq!(parent_path("/f1.txt"), "/");
        assert_eq!(parent_path("/"), "/");
    }
}
