use std::fs;
use std::path::PathBuf;

use crate::error::Error;

/// Owns the temporary chunk files of one sort, in batch order.
///
/// The files are deleted by [ChunkFiles::remove_all] or when the value is dropped, so every
/// exit path out of a sort removes them. Failing to delete a file never fails the sort, each
/// failure is logged as [Error::Cleanup].
///
/// # Examples
/// ```
/// use csv_file_sort::chunk_files::ChunkFiles;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("chunk-0.csv");
/// std::fs::write(&path, "id\n1\n").unwrap();
///
/// let mut chunk_files = ChunkFiles::new();
/// chunk_files.push(path.clone());
/// assert_eq!(chunk_files.remove_all(), 0);
/// assert!(!path.exists());
/// ```
#[derive(Debug, Default)]
pub struct ChunkFiles {
    paths: Vec<PathBuf>,
}

impl ChunkFiles {
    pub fn new() -> ChunkFiles {
        ChunkFiles {
            paths: Vec::new(),
        }
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Try to delete every file and forget all of them. Returns the number of failed deletions.
    pub fn remove_all(&mut self) -> usize {
        let mut failures = 0;
        for path in self.paths.drain(..) {
            if let Err(source) = fs::remove_file(&path) {
                failures += 1;
                log::warn!("{}", Error::Cleanup { path, source });
            }
        }
        failures
    }
}

impl Drop for ChunkFiles {
    fn drop(&mut self) {
        if !self.paths.is_empty() {
            self.remove_all();
        }
    }
}
