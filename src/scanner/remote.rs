//! Download task list from the remote tree

use super::{entry_name, join_name};
use crate::remote::{normalize_path, RemoteClient, RemoteEntry};
use crate::types::{Operation, RemoteError, SyncError, TransferTask};
use camino::{Utf8Path, Utf8PathBuf};
use futures::future::BoxFuture;
use tracing::debug;

/// Build the download task list for remote `root`.
///
/// Mirrors [`super::build_upload_list`], driven by remote stat and listing
/// calls. Any remote failure aborts enumeration; no partial list is returned.
pub async fn build_download_list(
    client: &dyn RemoteClient,
    root: &Utf8Path,
    destination: &Utf8Path,
) -> Result<Vec<TransferTask>, SyncError> {
    let mut tasks = Vec::new();
    let root = Utf8PathBuf::from(normalize_path(root.as_str()));
    collect(client, root.clone(), destination.to_path_buf(), &mut tasks).await?;
    debug!(root = %root, tasks = tasks.len(), "Download list built");
    Ok(tasks)
}

fn enumeration_error(path: &Utf8Path, err: RemoteError) -> SyncError {
    SyncError::Enumeration {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

fn child_path(dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{}/{}", dir.as_str().trim_end_matches('/'), name))
}

fn collect<'a>(
    client: &'a dyn RemoteClient,
    path: Utf8PathBuf,
    destination: Utf8PathBuf,
    tasks: &'a mut Vec<TransferTask>,
) -> BoxFuture<'a, Result<(), SyncError>> {
    Box::pin(async move {
        let entry = client
            .stat(path.as_str())
            .await
            .map_err(|e| enumeration_error(&path, e))?;

        match entry {
            RemoteEntry::File { .. } => {
                let to = join_name(&destination, entry_name(&path));
                debug!(from = %path, to = %to, "Queued download");
                tasks.push(TransferTask::new(Operation::Download, path, to));
            }
            RemoteEntry::Directory => {
                let nested = join_name(&destination, entry_name(&path));
                let names = client
                    .list_dir(path.as_str())
                    .await
                    .map_err(|e| enumeration_error(&path, e))?;
                for name in names {
                    collect(client, child_path(&path, &name), nested.clone(), tasks).await?;
                }
            }
            RemoteEntry::Other => {
                return Err(SyncError::UnsupportedFileType {
                    path: path.to_string(),
                });
            }
        }

        Ok(())
    })
}
