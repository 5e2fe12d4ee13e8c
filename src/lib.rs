//! This crate implements an external sort for delimited text files with a header line, for
//! example CSV or TSV, by a single column.
//!
//! The input is read in chunks of a fixed number of records. Each chunk is sorted in memory and
//! written to a temporary file, several chunks at a time on a pool of threads. The sorted chunks
//! are then merged into the output file. Peak memory is proportional to the chunk size and the
//! number of tasks rather than to the size of the input.
//!
//! Values are compared as text by default, so "10" sorts before "9". [comparison::Comparison::Typed]
//! compares Integer and Double columns numerically. Equal keys keep their input order.
//!
//! The crate also provides the record level reader and writer used by the sort, with
//! configurable encoding and delimiter, column type detection for previews and a utility to
//! concatenate two files sharing a header.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use csv_file_sort::csv_config::CsvConfig;
//! use csv_file_sort::sort::Sort;
//!
//! // parallel sort of semicolon separated files by the first column
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<PathBuf, anyhow::Error> {
//!     let mut csv_file_sort = Sort::new(vec![input], output, 0);
//!
//!     csv_file_sort.with_csv_config(CsvConfig::default().with_delimiter(";"));
//!
//!     // set the number of chunks sorted at a time. The default is 4, zero will use all
//!     // available cores.
//!     csv_file_sort.with_tasks(2);
//!
//!     // set the directory for intermediate results. The default is the system temp dir -
//!     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
//!     // directory for intermediate files, preferably on the same file system as the output result.
//!     csv_file_sort.with_tmp_dir(tmp);
//!
//!     Ok(csv_file_sort.sort()?)
//! }
//! ```
//!

pub(crate) mod sort_command;
pub(crate) mod line_record;
pub(crate) mod key;
pub(crate) mod sorted_chunk_file;
pub(crate) mod unmerged_chunk_file;
pub(crate) mod config;
pub(crate) mod chunk_iterator;
pub(crate) mod transcode;
pub(crate) mod literal;

pub mod sort;
pub mod field;
pub mod field_type;
pub mod order;
pub mod comparison;
pub mod error;
pub mod csv_config;
pub mod record;
pub mod reader;
pub mod writer;
pub mod chunk_files;
pub mod union;
