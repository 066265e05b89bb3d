//! Upload task list from the local filesystem

use super::{entry_name, join_name};
use crate::types::{Operation, SyncError, TransferTask};
use camino::Utf8Path;
use std::fs;
use tracing::debug;

/// Build the upload task list for `root`.
///
/// A file yields one task placed directly under `destination`. A directory
/// is mirrored under `destination` by its own name, and its entries are
/// visited in name order with that directory as their destination.
///
/// # Errors
/// Any stat or listing failure aborts enumeration, as does anything that
/// is neither a regular file nor a directory (symlinks, devices, sockets).
pub fn build_upload_list(
    root: &Utf8Path,
    destination: &Utf8Path,
) -> Result<Vec<TransferTask>, SyncError> {
    let mut tasks = Vec::new();
    collect(root, destination, &mut tasks)?;
    debug!(root = %root, tasks = tasks.len(), "Upload list built");
    Ok(tasks)
}

fn collect(
    path: &Utf8Path,
    destination: &Utf8Path,
    tasks: &mut Vec<TransferTask>,
) -> Result<(), SyncError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| SyncError::Enumeration {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let file_type = metadata.file_type();

    if file_type.is_file() {
        let to = join_name(destination, entry_name(path));
        debug!(from = %path, to = %to, "Queued upload");
        tasks.push(TransferTask::new(Operation::Upload, path, to));
    } else if file_type.is_dir() {
        let nested = join_name(destination, entry_name(path));
        for name in sorted_entries(path)? {
            collect(&path.join(&name), &nested, tasks)?;
        }
    } else {
        return Err(SyncError::UnsupportedFileType {
            path: path.to_string(),
        });
    }

    Ok(())
}

fn sorted_entries(dir: &Utf8Path) -> Result<Vec<String>, SyncError> {
    let enumeration_error = |reason: String| SyncError::Enumeration {
        path: dir.to_string(),
        reason,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| enumeration_error(e.to_string()))? {
        let entry = entry.map_err(|e| enumeration_error(e.to_string()))?;
        let name = entry.file_name().into_string().map_err(|raw| {
            enumeration_error(format!("non UTF-8 entry name {:?}", raw))
        })?;
        names.push(name);
    }
    names.sort();
    Ok(names)
}
