//! Task list enumeration
//!
//! The whole list is built before any transfer starts.

mod local;
mod remote;

pub use local::build_upload_list;
pub use remote::build_download_list;

use camino::{Utf8Path, Utf8PathBuf};

/// Last path segment, or nothing for roots like `/` and `.`
fn entry_name(path: &Utf8Path) -> Option<&str> {
    path.file_name()
}

fn join_name(destination: &Utf8Path, name: Option<&str>) -> Utf8PathBuf {
    match name {
        Some(name) => destination.join(name),
        None => destination.to_path_buf(),
    }
}
