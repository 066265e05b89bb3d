//! WebDAV client backed by an opendal operator

use super::{normalize_path, ByteStream, Connector, RemoteClient, RemoteEntry};
use crate::config::TransferSettings;
use crate::hash::normalize_etag;
use crate::types::{RemoteError, SyncError};
use async_trait::async_trait;
use futures::TryStreamExt;
use opendal::{EntryMode, ErrorKind, Operator};
use tracing::{debug, warn};

/// Opens a fresh WebDAV session per call
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDavConnector;

#[async_trait]
impl Connector for WebDavConnector {
    async fn connect(&self, settings: &TransferSettings) -> Result<Box<dyn RemoteClient>, SyncError> {
        let client = WebDavClient::new(settings)?;
        client
            .operator
            .check()
            .await
            .map_err(|e| SyncError::Connection(format!("{}: {}", settings.host, e)))?;
        debug!(host = %settings.host, user = %settings.user, "WebDAV session established");
        Ok(Box::new(client))
    }
}

pub struct WebDavClient {
    operator: Operator,
}

impl WebDavClient {
    pub fn new(settings: &TransferSettings) -> Result<Self, SyncError> {
        use opendal::services::Webdav;

        let mut builder = Webdav::default().endpoint(&settings.host);
        if !settings.user.is_empty() {
            builder = builder.username(&settings.user);
        }
        if !settings.password.is_empty() {
            builder = builder.password(&settings.password);
        }

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::Connection(format!("{}: {}", settings.host, e)))?
            .finish();

        Ok(Self { operator })
    }
}

fn map_error(path: &str, err: opendal::Error) -> RemoteError {
    if err.kind() == ErrorKind::NotFound {
        RemoteError::NotFound(path.to_string())
    } else {
        RemoteError::other(path, err)
    }
}

fn dir_path(path: &str) -> String {
    let path = normalize_path(path);
    if path == "/" {
        path
    } else {
        format!("{}/", path)
    }
}

#[async_trait]
impl RemoteClient for WebDavClient {
    async fn stat(&self, path: &str) -> Result<RemoteEntry, RemoteError> {
        let meta = self
            .operator
            .stat(path)
            .await
            .map_err(|e| map_error(path, e))?;

        Ok(match meta.mode() {
            EntryMode::FILE => RemoteEntry::File {
                etag: meta.etag().map(|tag| normalize_etag(tag).to_string()),
            },
            EntryMode::DIR => RemoteEntry::Directory,
            EntryMode::Unknown => RemoteEntry::Other,
        })
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        let dir = dir_path(path);
        let entries = self
            .operator
            .list(&dir)
            .await
            .map_err(|e| map_error(path, e))?;

        // Some servers include the collection itself in the listing.
        let own = dir.trim_matches('/');
        let mut names: Vec<String> = entries
            .iter()
            .filter(|entry| entry.path().trim_matches('/') != own)
            .map(|entry| entry.name().trim_end_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_dir_all(&self, path: &str) -> Result<(), RemoteError> {
        self.operator
            .create_dir(&dir_path(path))
            .await
            .map_err(|e| map_error(path, e))
    }

    async fn read_stream(&self, path: &str) -> Result<ByteStream, RemoteError> {
        let reader = self
            .operator
            .reader(path)
            .await
            .map_err(|e| map_error(path, e))?;
        let stream = reader
            .into_bytes_stream(..)
            .await
            .map_err(|e| map_error(path, e))?;
        Ok(Box::pin(stream))
    }

    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> Result<(), RemoteError> {
        let mut writer = self
            .operator
            .writer(path)
            .await
            .map_err(|e| map_error(path, e))?;

        loop {
            match stream.try_next().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = writer.write(chunk).await {
                        if let Err(abort_err) = writer.abort().await {
                            warn!(remote = path, error = %abort_err, "Could not abort upload");
                        }
                        return Err(map_error(path, e));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if let Err(abort_err) = writer.abort().await {
                        warn!(remote = path, error = %abort_err, "Could not abort upload");
                    }
                    return Err(RemoteError::other(path, e));
                }
            }
        }

        writer.close().await.map_err(|e| map_error(path, e))?;
        Ok(())
    }
}
