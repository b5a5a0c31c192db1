//! In-memory storage implementation for testing and transient indexes.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{Result, TamarixError};
use crate::storage::traits::{Storage, StorageInput, StorageOutput};

type FileMap = Arc<RwLock<AHashMap<String, Arc<[u8]>>>>;

/// An in-memory storage implementation.
///
/// Useful for tests and for indexes that do not need to outlive the process.
/// Files become visible only when their output is finished, which preserves
/// the all-or-nothing publication behavior of the file backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: FileMap,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        MemoryStorage {
            files: Arc::new(RwLock::new(AHashMap::new())),
        }
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.read();
        let data = files
            .get(name)
            .cloned()
            .ok_or_else(|| TamarixError::storage(format!("file not found: {name}")))?;
        Ok(Box::new(MemoryInput {
            cursor: Cursor::new(data),
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            buffer: Vec::new(),
            files: Arc::clone(&self.files),
            finished: false,
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.write().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.write();
        let data = files
            .remove(old_name)
            .ok_or_else(|| TamarixError::storage(format!("file not found: {old_name}")))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Input stream over an immutable in-memory file.
#[derive(Debug)]
struct MemoryInput {
    cursor: Cursor<Arc<[u8]>>,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }
}

/// Output stream buffering writes until finished.
#[derive(Debug)]
struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    files: FileMap,
    finished: bool,
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(TamarixError::storage(format!(
                "output already finished: {}",
                self.name
            )));
        }
        self.finished = true;
        let data: Arc<[u8]> = std::mem::take(&mut self.buffer).into();
        self.files.write().insert(self.name.clone(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_read() {
        let storage = MemoryStorage::new();

        let mut out = storage.create_output("seg-0.bin").unwrap();
        out.write_all(b"postings").unwrap();
        out.finish().unwrap();

        assert!(storage.file_exists("seg-0.bin"));
        let mut input = storage.open_input("seg-0.bin").unwrap();
        assert_eq!(input.read_all().unwrap(), b"postings");
    }

    #[test]
    fn test_unfinished_output_is_invisible() {
        let storage = MemoryStorage::new();

        let mut out = storage.create_output("seg-0.bin").unwrap();
        out.write_all(b"partial").unwrap();
        // Never finished: readers must not observe the file.
        assert!(!storage.file_exists("seg-0.bin"));
        drop(out);
        assert!(!storage.file_exists("seg-0.bin"));
    }

    #[test]
    fn test_rename_replaces_target() {
        let storage = MemoryStorage::new();

        for (name, content) in [("current.tmp", b"gen-2" as &[u8]), ("current", b"gen-1")] {
            let mut out = storage.create_output(name).unwrap();
            out.write_all(content).unwrap();
            out.finish().unwrap();
        }

        storage.rename_file("current.tmp", "current").unwrap();
        assert!(!storage.file_exists("current.tmp"));

        let mut input = storage.open_input("current").unwrap();
        assert_eq!(input.read_all().unwrap(), b"gen-2");
    }

    #[test]
    fn test_delete_and_list() {
        let storage = MemoryStorage::new();
        for name in ["b", "a", "c"] {
            let mut out = storage.create_output(name).unwrap();
            out.write_all(b"x").unwrap();
            out.finish().unwrap();
        }

        storage.delete_file("b").unwrap();
        // Deleting a missing file is not an error.
        storage.delete_file("b").unwrap();

        assert_eq!(storage.list_files().unwrap(), vec!["a", "c"]);
    }
}
