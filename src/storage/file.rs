//! File system storage implementation.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::error::{Result, TamarixError};
use crate::storage::traits::{Storage, StorageInput, StorageOutput};

/// A storage backend rooted at a directory on the local file system.
///
/// Outputs are written to a hidden temporary name and renamed into place on
/// `finish`, so a crash mid-write never leaves a partially written file
/// visible under its final name. `rename_file` maps to `std::fs::rename`,
/// which is the atomic publish primitive on the platforms we support.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at the given directory, creating the
    /// directory if it does not exist.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FileStorage { root })
    }

    /// Get the root directory of this storage.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let path = self.path_of(name);
        let file = File::open(&path)
            .map_err(|e| TamarixError::storage(format!("open {}: {e}", path.display())))?;
        let size = file.metadata()?.len();
        Ok(Box::new(FileInput {
            reader: BufReader::new(file),
            size,
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let temp_name = format!(".tmp-{name}");
        let temp_path = self.path_of(&temp_name);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| TamarixError::storage(format!("create {}: {e}", temp_path.display())))?;
        Ok(Box::new(FileOutput {
            writer: Some(BufWriter::new(file)),
            temp_path,
            final_path: self.path_of(name),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_of(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TamarixError::storage(format!("delete {name}: {e}"))),
        }
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        fs::rename(self.path_of(old_name), self.path_of(new_name))
            .map_err(|e| TamarixError::storage(format!("rename {old_name} -> {new_name}: {e}")))
    }

    fn sync(&self) -> Result<()> {
        // Directory fsync so renames survive a crash.
        let dir = File::open(&self.root)?;
        dir.sync_all()?;
        Ok(())
    }
}

/// Buffered input over a file.
#[derive(Debug)]
struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for FileInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// Buffered output writing through a temporary file.
#[derive(Debug)]
struct FileOutput {
    writer: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.writer.as_mut() {
            Some(w) => w.write(buf),
            None => Err(std::io::Error::other("output already finished")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl StorageOutput for FileOutput {
    fn finish(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| TamarixError::storage("output already finished"))?;
        let file = writer
            .into_inner()
            .map_err(|e| TamarixError::storage(format!("flush: {e}")))?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.temp_path, &self.final_path).map_err(|e| {
            TamarixError::storage(format!("publish {}: {e}", self.final_path.display()))
        })?;
        Ok(())
    }
}

impl Drop for FileOutput {
    fn drop(&mut self) {
        // An unfinished output leaves no trace under the final name.
        if self.writer.is_some() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
