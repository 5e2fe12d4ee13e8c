use std::sync::mpsc::SyncSender;
use std::sync::Mutex;

use anyhow::anyhow;
use command_executor::command::Command;

use crate::chunk_iterator::Chunk;
use crate::config::Config;
use crate::error::{self, Error};
use crate::line_record::LineRecord;
use crate::record::Record;
use crate::sort::{create_tmp_file, get_tl_config};
use crate::sorted_chunk_file::SortedChunkFile;
use crate::writer::CsvWriter;

pub(crate) type SortResult = (usize, error::Result<SortedChunkFile>);

/// Sorts one chunk on a pool thread and reports the written chunk file back to the splitter.
pub(crate) struct SortCommand {
    sequence: usize,
    chunk: Mutex<Option<Chunk>>,
    sender: Mutex<Option<SyncSender<SortResult>>>,
}

impl SortCommand {
    pub(crate) fn new(chunk: Chunk, sender: SyncSender<SortResult>) -> SortCommand {
        SortCommand {
            sequence: chunk.sequence(),
            chunk: Mutex::new(Some(chunk)),
            sender: Mutex::new(Some(sender)),
        }
    }

    fn write_sorted_chunk(chunk: Chunk, config: &Config) -> error::Result<SortedChunkFile> {
        let sequence = chunk.sequence();
        let mut line_records: Vec<LineRecord> = chunk
            .records()
            .into_iter()
            .map(|record| LineRecord::new(record, config))
            .collect();
        line_records.sort();
        let records: Vec<Record> = line_records.into_iter().map(LineRecord::record).collect();

        let tmp_file = create_tmp_file(config).map_err(Error::into_chunk_write)?;
        let path = tmp_file.path().to_path_buf();
        let file = tmp_file.as_file().try_clone().map_err(|e| Error::io(&path, e).into_chunk_write())?;
        let mut writer = CsvWriter::from_file(file, &path, config.csv_config(), config.header())
            .map_err(Error::into_chunk_write)?;
        writer.write_batch(&records).map_err(Error::into_chunk_write)?;
        writer.finish().map_err(Error::into_chunk_write)?;
        tmp_file.keep().map_err(
            |e| Error::ChunkWrite {
                path: path.clone(),
                source: e.error,
            }
        )?;

        log::debug!("Sorted chunk {} with {} records into {}", sequence, records.len(), path.display());
        Ok(SortedChunkFile::new(sequence, path, records.len()))
    }
}

impl Command for SortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        let sender = self.sender
            .lock()
            .map_err(|_| anyhow!("Sort command {} sender lock poisoned", self.sequence))?
            .take()
            .ok_or_else(|| anyhow!("Sort command {} executed twice", self.sequence))?;
        let chunk = self.chunk
            .lock()
            .map_err(|_| anyhow!("Sort command {} chunk lock poisoned", self.sequence))?
            .take();

        let result = match (chunk, get_tl_config()) {
            (Some(chunk), Some(config)) => Self::write_sorted_chunk(chunk, &config),
            (None, _) => Err(Error::WorkerPool(format!("chunk {} was already taken", self.sequence))),
            (_, None) => Err(Error::WorkerPool("sorting thread has no configuration".to_string())),
        };

        if let Err(e) = sender.send((self.sequence, result)) {
            // the splitter is gone, nobody will clean up the chunk
            if let (_, Ok(sorted_chunk_file)) = e.0 {
                let path = sorted_chunk_file.into_path();
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("{}", Error::Cleanup { path, source: e });
                }
            }
            return Err(anyhow!("Failed to report sorted chunk {}", self.sequence));
        }
        Ok(())
    }
}
