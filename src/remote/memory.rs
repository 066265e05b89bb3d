//! In-process remote with WebDAV-like semantics
//!
//! Every connection made by one [`MemoryConnector`] sees the same store, so
//! a pool of workers behaves like several sessions against one server.
//! Writing a file requires its parent collection to exist, as with PUT.

use super::{normalize_path, parent_path, ByteStream, Connector, RemoteClient, RemoteEntry};
use crate::config::TransferSettings;
use crate::hash::{hash_bytes, HashAlgorithm};
use crate::types::{RemoteError, SyncError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug)]
struct Store {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    others: BTreeSet<String>,
    refuse_connections: bool,
    refuse_dirs_under: Option<String>,
    connections: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            dirs: BTreeSet::from(["/".to_string()]),
            others: BTreeSet::new(),
            refuse_connections: false,
            refuse_dirs_under: None,
            connections: 0,
        }
    }
}

impl Store {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path) || self.others.contains(path)
    }

    fn mkdirs(&mut self, path: &str) -> Result<(), RemoteError> {
        let path = normalize_path(path);
        if let Some(prefix) = &self.refuse_dirs_under {
            if path == *prefix || path.starts_with(&format!("{}/", prefix)) {
                return Err(RemoteError::other(&path, "403 Forbidden"));
            }
        }

        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            if self.files.contains_key(&current) || self.others.contains(&current) {
                return Err(RemoteError::other(&current, "405 Method Not Allowed"));
            }
            self.dirs.insert(current.clone());
        }
        Ok(())
    }

    fn children(&self, dir: &str) -> Vec<String> {
        let names = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .chain(self.others.iter())
            .filter(|p| p.as_str() != "/" && parent_path(p) == dir)
            .filter_map(|p| p.rsplit('/').next().map(str::to_string));
        let mut names: Vec<String> = names.collect();
        names.sort();
        names
    }
}

/// Connector handing out sessions on a shared in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: Arc<Mutex<Store>>,
    algorithm: HashAlgorithm,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity tags are computed with `algorithm` instead of MD5
    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            store: Arc::default(),
            algorithm,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        lock_store(&self.store)
    }

    /// Make every following `connect` fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }

    /// Reject directory creation at or below `prefix`
    pub fn refuse_dirs_under(&self, prefix: &str) {
        self.lock().refuse_dirs_under = Some(normalize_path(prefix));
    }

    /// Number of sessions opened so far
    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    /// Store a file, creating its parents
    pub fn put_file(&self, path: &str, data: &[u8]) -> Result<(), RemoteError> {
        let path = normalize_path(path);
        let mut store = self.lock();
        store.mkdirs(&parent_path(&path))?;
        store.files.insert(path, data.to_vec());
        Ok(())
    }

    /// Register an entry that is neither a file nor a directory
    pub fn put_other(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize_path(path);
        let mut store = self.lock();
        store.mkdirs(&parent_path(&path))?;
        store.others.insert(path);
        Ok(())
    }

    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&normalize_path(path)).cloned()
    }

    /// All stored file paths, sorted
    pub fn file_paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn etag(&self, path: &str) -> Option<String> {
        self.read_file(path).map(|data| hash_bytes(&data, self.algorithm))
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, settings: &TransferSettings) -> Result<Box<dyn RemoteClient>, SyncError> {
        let mut store = self.lock();
        if store.refuse_connections {
            return Err(SyncError::Connection(format!(
                "{}: connection refused",
                settings.host
            )));
        }
        store.connections += 1;
        Ok(Box::new(MemoryClient {
            store: Arc::clone(&self.store),
            algorithm: self.algorithm,
        }))
    }
}

fn lock_store(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One session on a [`MemoryConnector`] store
pub struct MemoryClient {
    store: Arc<Mutex<Store>>,
    algorithm: HashAlgorithm,
}

#[async_trait]
impl RemoteClient for MemoryClient {
    async fn stat(&self, path: &str) -> Result<RemoteEntry, RemoteError> {
        let key = normalize_path(path);
        let store = lock_store(&self.store);
        if let Some(data) = store.files.get(&key) {
            Ok(RemoteEntry::File {
                etag: Some(hash_bytes(data, self.algorithm)),
            })
        } else if store.dirs.contains(&key) {
            Ok(RemoteEntry::Directory)
        } else if store.others.contains(&key) {
            Ok(RemoteEntry::Other)
        } else {
            Err(RemoteError::NotFound(path.to_string()))
        }
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        let key = normalize_path(path);
        let store = lock_store(&self.store);
        if store.dirs.contains(&key) {
            Ok(store.children(&key))
        } else if store.exists(&key) {
            Err(RemoteError::other(path, "not a collection"))
        } else {
            Err(RemoteError::NotFound(path.to_string()))
        }
    }

    async fn create_dir_all(&self, path: &str) -> Result<(), RemoteError> {
        lock_store(&self.store).mkdirs(path)
    }

    async fn read_stream(&self, path: &str) -> Result<ByteStream, RemoteError> {
        let key = normalize_path(path);
        let data = {
            let store = lock_store(&self.store);
            match store.files.get(&key) {
                Some(data) => data.clone(),
                None if store.exists(&key) => {
                    return Err(RemoteError::other(path, "not a file"));
                }
                None => return Err(RemoteError::NotFound(path.to_string())),
            }
        };

        let chunks: Vec<std::io::Result<Bytes>> = data
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> Result<(), RemoteError> {
        let mut data = Vec::new();
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| RemoteError::other(path, e))?
        {
            data.extend_from_slice(&chunk);
        }

        let key = normalize_path(path);
        let mut store = lock_store(&self.store);
        if !store.dirs.contains(&parent_path(&key)) {
            return Err(RemoteError::other(path, "409 Conflict"));
        }
        if store.dirs.contains(&key) || store.others.contains(&key) {
            return Err(RemoteError::other(path, "405 Method Not Allowed"));
        }
        store.files.insert(key, data);
        Ok(())
    }
}
