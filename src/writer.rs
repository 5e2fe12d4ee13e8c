use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};

use crate::csv_config::CsvConfig;
use crate::error::{Error, Result};
use crate::literal;
use crate::record::Record;
use crate::transcode::EncodingWriter;

/// Number of single record writes between flushes
pub const FLUSH_INTERVAL: usize = 200;

type EncodedFile = EncodingWriter<BufWriter<File>>;

enum Sink {
    Csv(Writer<EncodedFile>),
    Literal {
        out: EncodedFile,
        delimiter: String,
        line: String,
    },
}

impl Sink {
    fn write_fields<'a>(&mut self, fields: impl Iterator<Item = &'a str>, path: &Path) -> Result<()> {
        match self {
            Sink::Csv(writer) => writer.write_record(fields).map_err(|e| Error::from_csv(path, e)),
            Sink::Literal { out, delimiter, line } => {
                literal::write_record(out, fields, delimiter, line).map_err(|e| Error::io(path, e))
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Csv(writer) => writer.flush(),
            Sink::Literal { out, .. } => out.flush(),
        }
    }
}

/// Buffered writer of a delimited text file. The header is written on creation.
///
/// Records are encoded to the configured encoding as they are written. Fields containing the
/// delimiter, a quote or a line break are quoted and embedded quotes are doubled. Call
/// [CsvWriter::finish] to observe the final flush, dropping or closing the writer flushes as
/// well but only logs failures.
pub struct CsvWriter {
    path: PathBuf,
    sink: Option<Sink>,
    unflushed: usize,
}

impl CsvWriter {
    /// Create or truncate `path` and write `header` to it.
    pub fn create(path: &Path, config: &CsvConfig, header: &[String]) -> Result<CsvWriter> {
        config.validate()?;
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        CsvWriter::from_file(file, path, config, header)
    }

    pub(crate) fn from_file(file: File, path: &Path, config: &CsvConfig, header: &[String]) -> Result<CsvWriter> {
        let encoding = config.resolve_encoding()?;
        let out = EncodingWriter::new(BufWriter::new(file), encoding).map_err(|e| Error::io(path, e))?;
        let sink = match config.delimiter_byte() {
            Some(delimiter) => {
                let writer = WriterBuilder::new()
                    .delimiter(delimiter)
                    .quote(b'"')
                    .double_quote(true)
                    .quote_style(QuoteStyle::Necessary)
                    .terminator(Terminator::Any(b'\n'))
                    .has_headers(false)
                    .from_writer(out);
                Sink::Csv(writer)
            }
            None => Sink::Literal {
                out,
                delimiter: config.delimiter().to_string(),
                line: String::new(),
            },
        };

        let mut csv_writer = CsvWriter {
            path: path.to_path_buf(),
            sink: Some(sink),
            unflushed: 0,
        };
        csv_writer.write_fields(header.iter().map(String::as_str))?;
        Ok(csv_writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record, flushing every [FLUSH_INTERVAL] records.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_fields(record.iter())?;
        self.unflushed += 1;
        if self.unflushed >= FLUSH_INTERVAL {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all records and flush.
    pub fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_fields(record.iter())?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush().map_err(|e| Error::io(&self.path, e))?;
        }
        self.unflushed = 0;
        Ok(())
    }

    /// Flush the remaining records and release the file.
    pub fn finish(mut self) -> Result<()> {
        self.flush()?;
        self.sink = None;
        Ok(())
    }

    /// Flush and release the file, logging failures. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.flush() {
                log::warn!("Failed to flush {} on close: {}", self.path.display(), e);
            }
        }
    }

    fn write_fields<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_fields(fields, &self.path),
            None => Err(Error::io(&self.path, io::Error::new(io::ErrorKind::Other, "writer is closed"))),
        }
    }
}

impl Drop for CsvWriter {
    fn drop(&mut self) {
        self.close();
    }
}
