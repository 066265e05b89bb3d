//! Single-file upload and download

use crate::remote::{parent_path, ByteStream, RemoteClient};
use crate::types::{Operation, SyncError, TransferTask};
use camino::Utf8Path;
use futures::TryStreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::error;

const STREAM_BUFFER: usize = 128 * 1024;

/// Run the transfer for `task` in its direction
pub async fn transfer(client: &dyn RemoteClient, task: &TransferTask) -> Result<(), SyncError> {
    match task.operation {
        Operation::Upload => upload_one(client, &task.from, &task.to).await,
        Operation::Download => download_one(client, &task.from, &task.to).await,
    }
}

/// Stream local `from` to remote `to`, creating remote parents first.
///
/// A failure after the write started may leave a truncated remote file.
pub async fn upload_one(
    client: &dyn RemoteClient,
    from: &Utf8Path,
    to: &Utf8Path,
) -> Result<(), SyncError> {
    let parent = parent_path(to.as_str());
    client.create_dir_all(&parent).await.map_err(|e| {
        error!(file = %to, error = %e, "Could not create directory tree");
        e
    })?;

    let file = File::open(from).await.map_err(|e| {
        error!(file = %from, error = %e, "Could not open local file");
        e
    })?;

    let body: ByteStream = Box::pin(ReaderStream::with_capacity(file, STREAM_BUFFER));
    client.write_stream(to.as_str(), body).await.map_err(|e| {
        error!(file = %from, error = %e, "Could not upload file");
        e
    })?;

    Ok(())
}

/// Stream remote `from` into local `to`, creating local parents first.
///
/// The destination is truncated before copying; a failed copy leaves it
/// partially written.
pub async fn download_one(
    client: &dyn RemoteClient,
    from: &Utf8Path,
    to: &Utf8Path,
) -> Result<(), SyncError> {
    let mut remote = client.read_stream(from.as_str()).await.map_err(|e| {
        error!(file = %from, error = %e, "Could not open remote file for reading");
        e
    })?;

    if let Some(dirs) = to.parent() {
        fs::create_dir_all(dirs).await.map_err(|e| {
            error!(dir = %dirs, error = %e, "Could not create local directories");
            e
        })?;
    }

    let mut local = File::create(to).await.map_err(|e| {
        error!(file = %to, error = %e, "Could not open local file for writing");
        e
    })?;

    let copied: std::io::Result<()> = async {
        while let Some(chunk) = remote.try_next().await? {
            local.write_all(&chunk).await?;
        }
        local.flush().await
    }
    .await;

    copied.map_err(|e| {
        error!(local = %to, remote = %from, error = %e, "Could not copy remote file into a local");
        SyncError::Io(e)
    })
}
