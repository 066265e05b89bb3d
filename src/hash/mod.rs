//! Content fingerprints for local files

use crate::types::SyncError;
use clap::ValueEnum;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Digest used to fingerprint local content.
///
/// Must match what the server reports as the entity tag, otherwise every
/// file looks changed and is re-transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Blake3,
}

enum Hasher {
    Md5(md5::Context),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(ctx) => ctx.consume(data),
            Hasher::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Md5(ctx) => format!("{:x}", ctx.compute()),
            Hasher::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}

/// Compute the lowercase hex digest of a file.
///
/// The file is streamed in 64KB chunks.
///
/// # Example
/// ```no_run
/// use davsync::hash::{compute_hash, HashAlgorithm};
/// use std::path::Path;
///
/// let digest = compute_hash(Path::new("file.txt"), HashAlgorithm::Md5)?;
/// # Ok::<(), davsync::types::SyncError>(())
/// ```
pub fn compute_hash(file_path: &Path, algorithm: HashAlgorithm) -> Result<String, SyncError> {
    let mut file = File::open(file_path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize_hex())
}

/// Hex digest of an in-memory buffer
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Strip the quoting and weak-validator prefix servers put around entity tags
pub fn normalize_etag(etag: &str) -> &str {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.trim_matches('"')
}

/// Compare a server entity tag against a local digest
pub fn etag_matches(etag: &str, digest: &str) -> bool {
    let etag = normalize_etag(etag);
    !etag.is_empty() && etag.eq_ignore_ascii_case(digest)
}
