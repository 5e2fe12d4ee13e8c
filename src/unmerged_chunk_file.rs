use std::cmp::Ordering;
use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::line_record::LineRecord;
use crate::reader::CsvReader;
use crate::record::Record;

/// Merge cursor: an open chunk and its current front record. Exhausted chunks are dropped,
/// so a cursor always has a head.
pub(crate) struct UnmergedChunkFile {
    index: usize,
    reader: CsvReader,
    head: LineRecord,
}

impl UnmergedChunkFile {
    /// Open the chunk at `path`. Returns `None` for a chunk without records.
    pub(crate) fn open(index: usize, path: &Path, config: &Config) -> Result<Option<UnmergedChunkFile>> {
        let mut reader = CsvReader::open(path, config.csv_config()).map_err(Error::into_chunk_read)?;
        match Self::next(&mut reader, config)? {
            Some(head) => Ok(
                Some(
                    UnmergedChunkFile {
                        index,
                        reader,
                        head,
                    }
                )
            ),
            None => {
                reader.close();
                Ok(None)
            }
        }
    }

    /// Take the head record and advance. The cursor is returned unless its chunk is exhausted.
    pub(crate) fn pop(mut self, config: &Config) -> Result<(Record, Option<UnmergedChunkFile>)> {
        match Self::next(&mut self.reader, config)? {
            Some(next) => {
                let head = std::mem::replace(&mut self.head, next);
                Ok((head.record(), Some(self)))
            }
            None => {
                self.reader.close();
                Ok((self.head.record(), None))
            }
        }
    }

    fn next(reader: &mut CsvReader, config: &Config) -> Result<Option<LineRecord>> {
        match reader.read_record() {
            Ok(record) => Ok(Some(LineRecord::new(record, config))),
            Err(Error::EndOfInput) => Ok(None),
            Err(e) => Err(e.into_chunk_read()),
        }
    }
}

impl Eq for UnmergedChunkFile {}

impl PartialEq<Self> for UnmergedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for UnmergedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnmergedChunkFile {
    fn cmp(&self, other: &Self) -> Ordering {
        // flipped to work with BinaryHeap (Max Heap), on equal heads the lower index pops first
        other.head.cmp(&self.head)
            .then_with(|| other.index.cmp(&self.index))
    }
}
