use std::cell::RefCell;
use std::cmp::{max, min};
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::sync_channel;

use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool::ThreadPool;
use command_executor::thread_pool_builder::ThreadPoolBuilder;
use rlimit::{getrlimit, Resource, setrlimit};
use tempfile::{Builder, NamedTempFile};

use crate::chunk_files::ChunkFiles;
use crate::chunk_iterator::{Chunk, ChunkIterator};
use crate::comparison::Comparison;
use crate::config::Config;
use crate::csv_config::CsvConfig;
use crate::error::{Error, Result};
use crate::field_type::FieldType;
use crate::line_record::LineRecord;
use crate::order::Order;
use crate::reader::CsvReader;
use crate::sort_command::SortCommand;
use crate::unmerged_chunk_file::UnmergedChunkFile;
use crate::writer::CsvWriter;

/// Default number of records in one chunk
pub const DEFAULT_CHUNK_SIZE: usize = 300_000;
/// Default number of chunks sorted concurrently
pub const DEFAULT_TASKS: usize = 4;
/// Open files allowed on top of the chunk files during a merge
pub const NOFILE_HEADROOM: u64 = 256;

thread_local! {
    pub(crate) static CONFIG: RefCell<Option<Config>> = RefCell::new(None);
}

pub(crate) fn get_tl_config() -> Option<Config> {
    CONFIG.with(|config| config.borrow().clone())
}

pub(crate) fn create_tmp_file(config: &Config) -> Result<NamedTempFile> {
    Builder::new()
        .prefix(config.tmp_prefix())
        .suffix(config.tmp_suffix())
        .tempfile_in(config.tmp())
        .map_err(|e| Error::io(config.tmp(), e))
}

/// Sort delimited text files by one column
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use csv_file_sort::order::Order;
/// use csv_file_sort::sort::Sort;
///
/// // parallel external sort by the second column, descending
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<PathBuf, csv_file_sort::error::Error> {
///     let mut csv_file_sort = Sort::new(vec![input], output, 1);
///     csv_file_sort.with_order(Order::Desc);
///     // number of chunks read, sorted and written in one wave
///     csv_file_sort.with_tasks(2);
///     // records per chunk, bounds the memory used by each task
///     csv_file_sort.with_chunk_size(100_000);
///     // it is recommended to keep intermediate files on the same file system as the output
///     csv_file_sort.with_tmp_dir(tmp);
///     csv_file_sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
    column: usize,
    order: Order,
    chunk_size: usize,
    tasks: usize,
    tmp: PathBuf,
    csv_config: CsvConfig,
    comparison: Comparison,
}

impl Sort {
    /// Create a default Sort definition for the 0-based `column`.
    ///
    /// * all inputs must share the header of the first input
    /// * the default Order is Asc and the default Comparison is Ordinal
    /// * chunks hold [DEFAULT_CHUNK_SIZE] records, [DEFAULT_TASKS] chunks are sorted at a time
    /// * intermediate files go to std::env::temp_dir()
    /// * files are read and written as UTF-8 with ',' delimiter
    ///
    /// The Sort implementation will increase the file descriptor rlimit to accommodate the
    /// chunk files open during the merge
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf, column: usize) -> Sort {
        Sort {
            input_files,
            output,
            column,
            order: Order::Asc,
            chunk_size: DEFAULT_CHUNK_SIZE,
            tasks: DEFAULT_TASKS,
            tmp: std::env::temp_dir(),
            csv_config: CsvConfig::default(),
            comparison: Comparison::Ordinal,
        }
    }

    /// Set [Order]
    pub fn with_order(&mut self, order: Order) {
        self.order = order;
    }

    /// Set the number of records per chunk. Overrides the chunk size of the [CsvConfig].
    pub fn with_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Set the number of chunks sorted concurrently. Zero will use all system cores
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set encoding and delimiter of the inputs, the output and the intermediate files
    pub fn with_csv_config(&mut self, csv_config: CsvConfig) {
        self.csv_config = csv_config;
    }

    /// Set [Comparison]
    pub fn with_comparison(&mut self, comparison: Comparison) {
        self.comparison = comparison;
    }

    /// Sort the inputs into the output file and return its path.
    ///
    /// The output is written only when the merge completes, a failed sort leaves no output
    /// file behind. Intermediate files are removed on success and on failure.
    pub fn sort(&self) -> Result<PathBuf> {
        log::info!("Start sorting {} files by column {}", self.input_files.len(), self.column);
        let (config, readers) = self.prepare()?;
        let mut chunk_files = ChunkFiles::new();
        let result = Self::split(readers, &config, &mut chunk_files)
            .and_then(
                |records| {
                    log::info!("Split {} records into {} chunks", records, chunk_files.len());
                    Self::internal_merge(chunk_files.paths(), &config, &self.output)
                }
            );

        let failures = chunk_files.remove_all();
        if failures > 0 {
            log::warn!("Failed to remove {} intermediate files", failures);
        }
        let merged = result?;
        log::info!("Finish sorting, {} records written to {}", merged, self.output.display());
        Ok(self.output.clone())
    }

    /// Check that every input is sorted by the configured column, order and comparison
    pub fn check(&self) -> Result<bool> {
        let (config, readers) = self.prepare()?;
        for mut reader in readers {
            if !Self::internal_check(&mut reader, &config)? {
                log::info!("{} is not sorted", reader.path().display());
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn internal_check(reader: &mut CsvReader, config: &Config) -> Result<bool> {
        let mut previous: Option<LineRecord> = None;
        loop {
            let current = match reader.read_record() {
                Ok(record) => LineRecord::new(record, config),
                Err(Error::EndOfInput) => break,
                Err(e) => return Err(e),
            };
            if let Some(previous) = previous.as_ref() {
                if previous > &current {
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        reader.close();
        Ok(true)
    }

    /// Merge inputs that are already sorted into the output file and return its path. The
    /// inputs are kept.
    pub fn merge(&self) -> Result<PathBuf> {
        log::info!("Start merging {} files", self.input_files.len());
        let (config, mut readers) = self.prepare()?;
        readers.iter_mut().for_each(CsvReader::close);
        Self::internal_merge(&self.input_files, &config, &self.output)?;
        Ok(self.output.clone())
    }

    /// Validate the configuration and open the inputs. The column is checked against the
    /// header of the first input before anything is written.
    fn prepare(&self) -> Result<(Config, Vec<CsvReader>)> {
        if self.input_files.is_empty() {
            return Err(Error::Config("no input files".to_string()));
        }
        let csv_config = self.csv_config.clone().with_chunk_size(self.chunk_size);
        csv_config.validate()?;

        let mut tasks = self.tasks;
        if tasks == 0 {
            tasks = num_cpus::get();
        }

        let mut readers = Vec::with_capacity(self.input_files.len());
        let mut header: Vec<String> = Vec::new();
        let mut field_type = FieldType::String;
        for path in &self.input_files {
            let mut reader = CsvReader::open(path, &csv_config)?;
            if readers.is_empty() {
                let metadata = reader.read_meta()?;
                let field = metadata.fields()
                    .get(self.column)
                    .ok_or(
                        Error::InvalidSortColumn {
                            index: self.column,
                            columns: metadata.column_count(),
                        }
                    )?;
                field_type = field.field_type();
                header = metadata.column_names().into_iter().map(str::to_string).collect();
            } else if reader.header()? != header.as_slice() {
                return Err(Error::HeaderMismatch { path: path.clone() });
            }
            readers.push(reader);
        }

        let config = Config::new(
            self.tmp.clone(),
            "chunk-".to_string(),
            ".csv".to_string(),
            tasks,
            csv_config,
            header,
            self.column,
            field_type,
            self.comparison,
            self.order,
        );
        Ok((config, readers))
    }

    /// Read the inputs in waves of `tasks` chunks, each chunk is sorted and written on the
    /// sorting pool. Returns the number of records read.
    fn split(readers: Vec<CsvReader>, config: &Config, chunk_files: &mut ChunkFiles) -> Result<usize> {
        log::info!("Start parallel split, tasks: {}", config.tasks());
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut sorting_pool = thread_pool_builder
            .with_name("sorting".to_string())
            .with_tasks(config.tasks())
            .with_queue_size(config.queue_size())
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        sorting_pool.set_thread_local(&CONFIG, Some(config.clone()));

        let result = Self::split_waves(&mut sorting_pool, ChunkIterator::new(readers), config, chunk_files);

        log::info!("Shutting down sorting pool");
        sorting_pool.shutdown();
        let joined = sorting_pool.join().map_err(|e| Error::WorkerPool(e.to_string()));
        let records = result?;
        joined?;
        Ok(records)
    }

    fn split_waves(sorting_pool: &mut ThreadPool, mut chunks: ChunkIterator, config: &Config, chunk_files: &mut ChunkFiles) -> Result<usize> {
        let mut records = 0;
        loop {
            let mut wave: Vec<Chunk> = Vec::with_capacity(config.tasks());
            while wave.len() < config.tasks() {
                match chunks.next() {
                    Some(chunk) => wave.push(chunk?),
                    None => break,
                }
            }
            if wave.is_empty() {
                return Ok(records);
            }
            records += Self::sort_wave(sorting_pool, wave, chunk_files)?;
        }
    }

    /// Submit one command per chunk and wait for all of them. Chunk files are added in batch
    /// order, including the ones written before a failure so they can be removed.
    fn sort_wave(sorting_pool: &mut ThreadPool, wave: Vec<Chunk>, chunk_files: &mut ChunkFiles) -> Result<usize> {
        let size = wave.len();
        let (sender, receiver) = sync_channel(size);
        for chunk in wave {
            log::debug!("Submit chunk {} with {} records", chunk.sequence(), chunk.len());
            sorting_pool.submit(Box::new(SortCommand::new(chunk, sender.clone())));
        }
        drop(sender);

        let mut sorted = Vec::with_capacity(size);
        let mut failure = None;
        for _ in 0..size {
            match receiver.recv() {
                Ok((_, Ok(sorted_chunk_file))) => sorted.push(sorted_chunk_file),
                Ok((sequence, Err(e))) => {
                    log::error!("Failed to sort chunk {}: {}", sequence, e);
                    failure.get_or_insert(e);
                }
                Err(_) => {
                    failure.get_or_insert(Error::WorkerPool("a sorting task stopped without a result".to_string()));
                    break;
                }
            }
        }

        sorted.sort();
        let mut records = 0;
        for sorted_chunk_file in sorted {
            records += sorted_chunk_file.records();
            chunk_files.push(sorted_chunk_file.into_path());
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }

    /// K-way merge of sorted `files` into `output`. On equal keys the record of the earlier
    /// file comes first. Returns the number of records written.
    pub(crate) fn internal_merge(files: &[PathBuf], config: &Config, output: &Path) -> Result<u64> {
        log::info!("Merging {} sorted files into {}", files.len(), output.display());
        let _file_limit = FileLimitGuard::raise(files.len() as u64 + NOFILE_HEADROOM);

        let mut unmerged_files: BinaryHeap<UnmergedChunkFile> = BinaryHeap::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            if let Some(unmerged_file) = UnmergedChunkFile::open(index, path, config)? {
                unmerged_files.push(unmerged_file);
            }
        }

        let merged_file = create_merged_file(output)?;
        let merged_path = merged_file.path().to_path_buf();
        let file = merged_file.as_file().try_clone().map_err(|e| Error::io(&merged_path, e))?;
        let mut merged_writer = CsvWriter::from_file(file, &merged_path, config.csv_config(), config.header())?;

        let mut merged_len: u64 = 0;
        let mut current_min = unmerged_files.pop();
        while let Some(unmerged_file) = current_min.take() {
            let (record, next) = unmerged_file.pop(config)?;
            merged_writer.write_record(&record)?;
            merged_len += 1;
            current_min = match next {
                // comparison operators are flipped to work with BinaryHeap (Max Heap)
                Some(next) => match unmerged_files.peek() {
                    Some(unmerged_min) if *unmerged_min > next => {
                        unmerged_files.push(next);
                        unmerged_files.pop()
                    }
                    _ => Some(next),
                },
                None => unmerged_files.pop(),
            };
        }

        merged_writer.finish()?;
        merged_file.persist(output).map_err(|e| Error::io(output, e.error))?;
        log::info!("Finished merging sorted files, merged length: {} records", merged_len);
        Ok(merged_len)
    }
}

/// The merged output is written next to the destination and renamed over it when complete.
fn create_merged_file(output: &Path) -> Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Builder::new()
        .prefix(".csv-file-sort-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(output, e))
}

/// Raises the soft NOFILE rlimit for the lifetime of a merge and restores it on drop.
struct FileLimitGuard {
    restore: Option<(u64, u64)>,
}

impl FileLimitGuard {
    fn raise(required: u64) -> FileLimitGuard {
        let (current_soft, current_hard) = match getrlimit(Resource::NOFILE) {
            Ok(limits) => limits,
            Err(e) => {
                log::warn!("Failed to get rlimit NOFILE: {}", e);
                return FileLimitGuard { restore: None };
            }
        };
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let new_soft = min(max(required, current_soft), current_hard);
        if new_soft == current_soft {
            return FileLimitGuard { restore: None };
        }
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        match setrlimit(Resource::NOFILE, new_soft, current_hard) {
            Ok(()) => FileLimitGuard { restore: Some((current_soft, current_hard)) },
            Err(e) => {
                log::warn!("Failed to set rlimit NOFILE, soft: {}, hard: {}: {}", new_soft, current_hard, e);
                FileLimitGuard { restore: None }
            }
        }
    }
}

impl Drop for FileLimitGuard {
    fn drop(&mut self) {
        if let Some((soft, hard)) = self.restore {
            log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", soft, hard);
            if let Err(e) = setrlimit(Resource::NOFILE, soft, hard) {
                log::warn!("Failed to restore rlimit NOFILE: {}", e);
            }
        }
    }
}
