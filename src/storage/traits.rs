//! Storage traits and common types.

use std::io::{Read, Seek, Write};

use crate::error::Result;

/// A trait for storage backends that can store and retrieve named byte
/// sequences.
///
/// This is the engine's only contact with persistence. Implementations must
/// provide ordered byte-range reads, sequential-append writes, and an atomic
/// `rename_file` used to publish a new snapshot root.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing. An existing file with the same name is
    /// truncated.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Rename a file, replacing any existing target atomically.
    ///
    /// This is the publication primitive: a reader observes either the old
    /// or the new content of the target name, never a partial state.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Sync all pending writes to durable storage.
    fn sync(&self) -> Result<()>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input in bytes.
    fn size(&self) -> Result<u64>;

    /// Read the entire content into a byte vector.
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size()? as usize);
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered data and make the file visible under its name.
    fn finish(&mut self) -> Result<()>;
}
