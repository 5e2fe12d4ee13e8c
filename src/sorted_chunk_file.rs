use std::cmp::Ordering;
use std::path::PathBuf;

/// A chunk written to disk, ordered by the position of its batch in the input
#[derive(Debug)]
pub(crate) struct SortedChunkFile {
    sequence: usize,
    path: PathBuf,
    records: usize,
}

impl SortedChunkFile {
    pub(crate) fn new(sequence: usize, path: PathBuf, records: usize) -> SortedChunkFile {
        SortedChunkFile {
            sequence,
            path,
            records,
        }
    }

    pub(crate) fn records(&self) -> usize {
        self.records
    }

    pub(crate) fn into_path(self) -> PathBuf {
        self.path
    }
}

impl Eq for SortedChunkFile {}

impl PartialEq<Self> for SortedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.sequence.eq(&other.sequence)
    }
}

impl PartialOrd<Self> for SortedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedChunkFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}
