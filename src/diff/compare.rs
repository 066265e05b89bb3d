//! Change detection between a task's two sides

use crate::hash::{compute_hash, etag_matches, HashAlgorithm};
use crate::remote::{RemoteClient, RemoteEntry};
use crate::types::TransferTask;
use camino::Utf8Path;
use tracing::{debug, error};

/// Decide whether `task` has to be transferred.
///
/// The remote side is looked up and its entity tag compared against a
/// digest of the local side: the source for uploads, the existing
/// destination for downloads. Equal digests are the only reason to skip.
///
/// Every doubt resolves toward transferring:
/// 1. Remote entry missing → transfer
/// 2. Remote lookup fails for another reason → transfer
/// 3. Remote entry is not a plain file, or has no tag → transfer
/// 4. Local digest cannot be computed → transfer
/// 5. Digests differ → transfer
pub async fn needs_transfer(
    client: &dyn RemoteClient,
    task: &TransferTask,
    algorithm: HashAlgorithm,
) -> bool {
    let remote = task.remote_path();
    let local = task.local_path();

    let etag = match client.stat(remote.as_str()).await {
        Ok(RemoteEntry::File { etag: Some(etag) }) => etag,
        Ok(RemoteEntry::File { etag: None }) => {
            debug!(remote = %remote, "Remote file has no entity tag (still transferring)");
            return true;
        }
        Ok(entry) => {
            error!(remote = %remote, entry = ?entry, "Stat for remote file has unexpected type (still transferring)");
            return true;
        }
        Err(e) if e.is_not_found() => {
            debug!(remote = %remote, "Remote file is absent");
            return true;
        }
        Err(e) => {
            debug!(remote = %remote, error = %e, "Remote lookup failed (still transferring)");
            return true;
        }
    };

    let Some(digest) = local_digest(local, algorithm).await else {
        return true;
    };

    if !etag_matches(&etag, &digest) {
        debug!(
            local = %local,
            remote = %remote,
            local_hash = %digest,
            remote_hash = %etag,
            "Hash mismatch for local and remote"
        );
        return true;
    }

    debug!(local = %local, remote = %remote, "Local and remote have same hash");
    false
}

async fn local_digest(path: &Utf8Path, algorithm: HashAlgorithm) -> Option<String> {
    let owned = path.to_path_buf();
    let joined =
        tokio::task::spawn_blocking(move || compute_hash(owned.as_std_path(), algorithm)).await;

    match joined {
        Ok(Ok(digest)) => Some(digest),
        Ok(Err(e)) => {
            debug!(file = %path, error = %e, "Could not calculate hash");
            None
        }
        Err(e) => {
            debug!(file = %path, error = %e, "Hashing task did not finish");
            None
        }
    }
}
