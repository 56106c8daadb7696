// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The persistent namespace the shuffle reads and writes through.

use crate::naming::StreamId;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Trait for abstracting where named streams live
/// Different implementations for a local directory, memory, etc.
pub trait StreamStore: Send + Sync {
    /// Create (or truncate) a stream for writing
    fn create(&self, id: &StreamId) -> io::Result<Box<dyn Write + Send>>;

    /// Open an existing stream for reading
    /// Returns `ErrorKind::NotFound` if the stream was never written
    fn open(&self, id: &StreamId) -> io::Result<Box<dyn Read + Send>>;

    fn remove(&self, id: &StreamId) -> io::Result<()>;

    fn exists(&self, id: &StreamId) -> bool;
}

/// One file per stream inside a working directory
#[derive(Debug, Clone)]
pub struct FileStreamStore {
    root: PathBuf,
}

impl FileStreamStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &StreamId) -> PathBuf {
        self.root.join(id.as_str())
    }
}

impl StreamStore for FileStreamStore {
    fn create(&self, id: &StreamId) -> io::Result<Box<dyn Write + Send>> {
        let file = File::create(self.path_of(id))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn open(&self, id: &StreamId) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.path_of(id))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn remove(&self, id: &StreamId) -> io::Result<()> {
        fs::remove_file(self.path_of(id))
    }

    fn exists(&self, id: &StreamId) -> bool {
        self.path_of(id).is_file()
    }
}

type StreamMap = Arc<Mutex<HashMap<StreamId, Vec<u8>>>>;

/// Streams held in memory, shared between clones of the store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStreamStore {
    streams: StreamMap,
}

impl InMemoryStreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes of a stream, if it exists
    pub fn get(&self, id: &StreamId) -> Option<Vec<u8>> {
        self.lock().get(id).cloned()
    }

    /// Replace a stream's bytes directly
    pub fn put(&self, id: &StreamId, bytes: Vec<u8>) {
        self.lock().insert(id.clone(), bytes);
    }

    /// Every stream currently present, sorted by name
    pub fn names(&self) -> Vec<StreamId> {
        let mut names: Vec<StreamId> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StreamId, Vec<u8>>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.streams.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StreamStore for InMemoryStreamStore {
    fn create(&self, id: &StreamId) -> io::Result<Box<dyn Write + Send>> {
        self.put(id, Vec::new());
        Ok(Box::new(InMemoryWriter {
            id: id.clone(),
            buffer: Vec::new(),
            streams: self.streams.clone(),
        }))
    }

    fn open(&self, id: &StreamId) -> io::Result<Box<dyn Read + Send>> {
        match self.get(id) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("stream {} not found", id),
            )),
        }
    }

    fn remove(&self, id: &StreamId) -> io::Result<()> {
        match self.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("stream {} not found", id),
            )),
        }
    }

    fn exists(&self, id: &StreamId) -> bool {
        self.lock().contains_key(id)
    }
}

/// Buffers writes and publishes them to the store on flush and on drop
struct InMemoryWriter {
    id: StreamId,
    buffer: Vec<u8>,
    streams: StreamMap,
}

impl InMemoryWriter {
    fn publish(&self) {
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        // A stream removed while still open stays removed.
        if let Some(stream) = streams.get_mut(&self.id) {
            stream.clone_from(&self.buffer);
        }
    }
}

impl Write for InMemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl Drop for InMemoryWriter {
    fn drop(&mut self) {
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_write_then_read() {
        let store = InMemoryStreamStore::new();
        let id = StreamId::new("s");
        {
            let mut w = store.create(&id).unwrap();
            w.write_all(b"hello").unwrap();
            w.flush().unwrap();
        }
        let mut contents = String::new();
        store.open(&id).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn test_in_memory_created_stream_exists_while_empty() {
        let store = InMemoryStreamStore::new();
        let id = StreamId::new("empty");
        let _w = store.create(&id).unwrap();
        assert!(store.exists(&id));
        assert_eq!(store.get(&id), Some(Vec::new()));
    }

    #[test]
    fn test_in_memory_missing_stream_is_not_found() {
        let store = InMemoryStreamStore::new();
        let err = store.open(&StreamId::new("nope")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_file_store_round_trip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStreamStore::new(dir.path().join("work")).unwrap();
        let id = StreamId::new("mrtmp.job-0-0");
        {
            let mut w = store.create(&id).unwrap();
            w.write_all(b"abc").unwrap();
            w.flush().unwrap();
        }
        assert!(store.exists(&id));
        let mut contents = String::new();
        store.open(&id).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "abc");

        store.remove(&id).unwrap();
        assert!(!store.exists(&id));
        assert_eq!(
            store.open(&id).err().unwrap().kind(),
            io::ErrorKind::NotFound
        );
    }
}
