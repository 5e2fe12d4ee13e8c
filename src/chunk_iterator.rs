use std::collections::VecDeque;

use crate::error::Result;
use crate::reader::CsvReader;
use crate::record::Record;

/// One batch of unsorted records and its position in the input.
#[derive(Debug)]
pub(crate) struct Chunk {
    sequence: usize,
    records: Vec<Record>,
}

impl Chunk {
    pub(crate) fn new(sequence: usize, records: Vec<Record>) -> Chunk {
        Chunk {
            sequence,
            records,
        }
    }

    pub(crate) fn sequence(&self) -> usize {
        self.sequence
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn records(self) -> Vec<Record> {
        self.records
    }
}

/// Reads the inputs one after another in batches of the reader chunk size. Batches are
/// numbered across all inputs. Iteration stops after the first error.
pub(crate) struct ChunkIterator {
    readers: VecDeque<CsvReader>,
    sequence: usize,
}

impl ChunkIterator {
    pub(crate) fn new(readers: Vec<CsvReader>) -> ChunkIterator {
        ChunkIterator {
            readers: readers.into(),
            sequence: 0,
        }
    }
}

impl Iterator for ChunkIterator {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(reader) = self.readers.front_mut() {
            match reader.read_batch() {
                Ok(records) if records.is_empty() => {
                    reader.close();
                    self.readers.pop_front();
                }
                Ok(records) => {
                    let chunk = Chunk::new(self.sequence, records);
                    self.sequence += 1;
                    return Some(Ok(chunk));
                }
                Err(e) => {
                    self.readers.clear();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
