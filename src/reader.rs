use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, Reader, ReaderBuilder};
use encoding_rs::Encoding;

use crate::csv_config::CsvConfig;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::field_type::FieldType;
use crate::literal::LiteralReader;
use crate::record::Record;
use crate::transcode::{decoding_reader, utf8_field, DecodedFile};

/// Lifecycle of a [CsvReader]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderState {
    /// The file is open, nothing was read yet
    Opened,
    /// The header line was consumed
    HeaderRead,
    /// At least one data record was returned
    Streaming,
    /// The last record was returned
    Exhausted,
    /// The file is released
    Closed,
}

/// Header names with their inferred types and the format settings of a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    fields: Vec<Field>,
    delimiter: String,
    encoding: String,
}

impl Metadata {
    pub fn fields(&self) -> &Vec<Field> {
        &self.fields
    }

    pub fn column_count(&self) -> usize {
        self.fields.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name()).collect()
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

/// Streaming reader of a delimited text file with a header line.
///
/// The file is decoded to UTF-8 before it is split into fields, so multi-byte encodings never
/// split a character on the delimiter. Fields may be quoted with `"`, embedded quotes are
/// doubled. Every record must have as many fields as the header.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use csv_file_sort::csv_config::CsvConfig;
/// use csv_file_sort::reader::CsvReader;
///
/// fn preview(path: &Path) -> Result<(), csv_file_sort::error::Error> {
///     let mut reader = CsvReader::open(path, &CsvConfig::default())?;
///     let metadata = reader.read_meta()?.clone();
///     println!("{:?}", metadata.column_names());
///     for record in reader.read_batch()? {
///         println!("{:?}", record.fields());
///     }
///     reader.close();
///     Ok(())
/// }
/// ```
pub struct CsvReader {
    path: PathBuf,
    config: CsvConfig,
    encoding: &'static Encoding,
    source: Option<Source>,
    state: ReaderState,
    header: Vec<String>,
    metadata: Option<Metadata>,
    lookahead: Option<Record>,
}

enum Source {
    Csv {
        reader: Reader<DecodedFile>,
        buffer: ByteRecord,
    },
    Literal(LiteralReader<DecodedFile>),
}

impl Source {
    fn header(&mut self, path: &Path) -> Result<Vec<String>> {
        match self {
            Source::Csv { reader, .. } => {
                let header = reader.byte_headers().map_err(|e| Error::from_csv(path, e))?;
                header.iter().map(|field| utf8_field(field, path, 1)).collect()
            }
            Source::Literal(reader) => Ok(reader.read_record(path)?.map(|(_, fields)| fields).unwrap_or_default()),
        }
    }

    fn next(&mut self, path: &Path) -> Result<Option<Record>> {
        match self {
            Source::Csv { reader, buffer } => {
                match reader.read_byte_record(buffer) {
                    Ok(true) => {
                        let line = buffer.position().map(|position| position.line()).unwrap_or(0);
                        buffer
                            .iter()
                            .map(|field| utf8_field(field, path, line))
                            .collect::<Result<Vec<String>>>()
                            .map(|fields| Some(Record::new(fields)))
                    }
                    Ok(false) => Ok(None),
                    Err(e) => Err(Error::from_csv(path, e)),
                }
            }
            Source::Literal(reader) => Ok(reader.read_record(path)?.map(|(_, fields)| Record::new(fields))),
        }
    }
}

impl CsvReader {
    /// Open `path` for reading. Missing or unreadable paths fail with
    /// [Error::SourceUnavailable].
    pub fn open(path: &Path, config: &CsvConfig) -> Result<CsvReader> {
        config.validate()?;
        let encoding = config.resolve_encoding()?;
        let unavailable = |source| Error::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        if file.metadata().map_err(unavailable)?.is_dir() {
            return Err(unavailable(std::io::Error::new(std::io::ErrorKind::Other, "is a directory")));
        }

        let decoded = decoding_reader(file, encoding);
        let source = match config.delimiter_byte() {
            Some(delimiter) => {
                let reader = ReaderBuilder::new()
                    .delimiter(delimiter)
                    .quote(b'"')
                    .double_quote(true)
                    .has_headers(true)
                    .flexible(false)
                    .from_reader(decoded);
                Source::Csv {
                    reader,
                    buffer: ByteRecord::new(),
                }
            }
            None => Source::Literal(LiteralReader::new(decoded, config.delimiter())),
        };

        Ok(
            CsvReader {
                path: path.to_path_buf(),
                config: config.clone(),
                encoding,
                source: Some(source),
                state: ReaderState::Opened,
                header: Vec::new(),
                metadata: None,
                lookahead: None,
            }
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Read the header and infer column types from the first data record.
    ///
    /// The first data record is kept and returned by the next read. Calling this again
    /// returns the cached result.
    pub fn read_meta(&mut self) -> Result<&Metadata> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => self.infer_metadata()?,
        };
        Ok(&*self.metadata.insert(metadata))
    }

    /// The header names, in order.
    pub fn header(&mut self) -> Result<&[String]> {
        self.read_header()?;
        Ok(&self.header)
    }

    /// Read the next record. Fails with [Error::EndOfInput] when the source is exhausted.
    pub fn read_record(&mut self) -> Result<Record> {
        self.read_header()?;
        if let Some(record) = self.lookahead.take() {
            self.state = ReaderState::Streaming;
            return Ok(record);
        }
        match self.next_record()? {
            Some(record) => {
                self.state = ReaderState::Streaming;
                Ok(record)
            }
            None => {
                if self.state != ReaderState::Closed {
                    self.state = ReaderState::Exhausted;
                }
                Err(Error::EndOfInput)
            }
        }
    }

    /// Read up to chunk size records. Returns an empty batch when the source is exhausted.
    pub fn read_batch(&mut self) -> Result<Vec<Record>> {
        let mut batch = Vec::new();
        while batch.len() < self.config.chunk_size() {
            match self.read_record() {
                Ok(record) => batch.push(record),
                Err(Error::EndOfInput) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(batch)
    }

    /// Release the file. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            log::trace!("Closed {}", self.path.display());
        }
        self.lookahead = None;
        self.state = ReaderState::Closed;
    }

    fn infer_metadata(&mut self) -> Result<Metadata> {
        self.read_header()?;
        if self.lookahead.is_none() && self.state != ReaderState::Exhausted {
            self.lookahead = self.next_record()?;
        }
        let fields = self.header
            .iter()
            .enumerate()
            .map(
                |(index, name)| {
                    let field_type = self.lookahead
                        .as_ref()
                        .and_then(|record| record.get(index))
                        .map(FieldType::detect)
                        .unwrap_or(FieldType::String);
                    Field::new(index, field_type).with_name(name.clone())
                }
            )
            .collect();
        Ok(
            Metadata {
                fields,
                delimiter: self.config.delimiter().to_string(),
                encoding: self.encoding.name().to_string(),
            }
        )
    }

    fn read_header(&mut self) -> Result<()> {
        if self.state != ReaderState::Opened {
            return Ok(());
        }
        if let Some(source) = self.source.as_mut() {
            self.header = source.header(&self.path)?;
        }
        self.state = ReaderState::HeaderRead;
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        match self.source.as_mut() {
            Some(source) => source.next(&self.path),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use encoding_rs::SHIFT_JIS;
    use tempfile::TempDir;

    use crate::csv_config::CsvConfig;
    use crate::error::Error;
    use crate::field_type::FieldType;
    use crate::reader::{CsvReader, ReaderState};

    const NORMAL: &str = "\
Index,Customer Id,Code,Company,First name,Last name,Active,Since
1,100,ab12cd,Acme,Jane,Doe,true,2021-01-01
2,101,xz99qq,Initech,John,Roe,false,2021-02-01
3,102,\"a,b\",\"Quoted \"\"Name\"\"\",Ann,Lee,true,2021-03-01
4,103,14ju73,Umbrella,Bob,Ray,false,2021-04-01
5,104,pp00aa,\"Multi
line\",Eve,Kim,true,2021-05-01
";

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn open(path: &Path, config: CsvConfig) -> CsvReader {
        CsvReader::open(path, &config).unwrap()
    }

    #[test]
    fn test_read_meta() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, "normal.csv", NORMAL.as_bytes());
        let mut reader = open(&path, CsvConfig::default());
        let metadata = reader.read_meta()?.clone();
        assert_eq!(metadata.column_count(), 8);
        assert_eq!(metadata.column_names()[4], "First name");
        assert_eq!(metadata.fields()[1].field_type(), FieldType::Integer);
        assert_eq!(metadata.fields()[2].field_type(), FieldType::String);
        assert_eq!(metadata.fields()[6].field_type(), FieldType::Boolean);
        assert_eq!(metadata.fields()[7].field_type(), FieldType::Date);
        assert_eq!(metadata.delimiter(), ",");
        assert_eq!(metadata.encoding(), "UTF-8");

        // the record used for inference is replayed
        let batch = reader.read_batch()?;
        assert_eq!(batch.len(), 5);
        assert_eq!(batch[0].get(0), Some("1"));
        assert_eq!(batch[3].get(2), Some("14ju73"));
        assert_eq!(batch[2].get(2), Some("a,b"));
        assert_eq!(batch[2].get(3), Some("Quoted \"Name\""));
        assert_eq!(batch[4].get(3), Some("Multi\nline"));
        Ok(())
    }

    #[test]
    fn test_semicolon_delimiter() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let content = NORMAL.replace(',', ";");
        let path = write(&dir, "semicolon.csv", content.as_bytes());
        let mut reader = open(&path, CsvConfig::default().with_delimiter(";"));
        let metadata = reader.read_meta()?.clone();
        assert_eq!(metadata.column_count(), 8);
        assert_eq!(metadata.column_names()[5], "Last name");
        assert_eq!(reader.read_batch()?.len(), 5);
        Ok(())
    }

    #[test]
    fn test_batches_and_end_of_input() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, "normal.csv", NORMAL.as_bytes());
        let mut reader = open(&path, CsvConfig::default().with_chunk_size(2));
        assert_eq!(reader.state(), ReaderState::Opened);
        assert_eq!(reader.read_batch()?.len(), 2);
        assert_eq!(reader.state(), ReaderState::Streaming);
        assert_eq!(reader.read_batch()?.len(), 2);
        assert_eq!(reader.read_batch()?.len(), 1);
        assert!(reader.read_batch()?.is_empty());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert!(matches!(reader.read_record(), Err(Error::EndOfInput)));
        Ok(())
    }

    #[test]
    fn test_header_only() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, "header.csv", b"a,b,c\n");
        let mut reader = open(&path, CsvConfig::default());
        let metadata = reader.read_meta()?.clone();
        assert_eq!(metadata.column_count(), 3);
        assert!(metadata.fields().iter().all(|field| field.field_type() == FieldType::String));
        assert!(matches!(reader.read_record(), Err(Error::EndOfInput)));
        Ok(())
    }

    #[test]
    fn test_source_unavailable() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("missing.csv");
        let result = CsvReader::open(&missing, &CsvConfig::default());
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));

        let result = CsvReader::open(dir.path(), &CsvConfig::default());
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
        Ok(())
    }

    #[test]
    fn test_malformed_record() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, "short.csv", b"a,b,c\n1,2,3\n4,5\n");
        let mut reader = open(&path, CsvConfig::default());
        assert_eq!(reader.read_record()?.len(), 3);
        match reader.read_record() {
            Err(Error::MalformedRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other.map(|record| record.into_fields())),
        }
        Ok(())
    }

    #[test]
    fn test_invalid_encoding_bytes() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, "latin.csv", b"name\ncaf\xe9\n");
        let mut reader = open(&path, CsvConfig::default());
        assert!(matches!(reader.read_record(), Err(Error::MalformedRecord { .. })));

        let mut reader = open(&path, CsvConfig::default().with_encoding("windows-1252"));
        assert_eq!(reader.read_record()?.get(0), Some("café"));
        Ok(())
    }

    #[test]
    fn test_multi_byte_encoding_with_delimiter_trail_byte() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        // the second byte of "ポ" in Shift_JIS is 0x7C, the same byte as '|'
        let (bytes, _, _) = SHIFT_JIS.encode("name|value\nポ|1\nア|2\n");
        assert_eq!(&bytes[11..13], &[0x83, 0x7C]);
        let path = write(&dir, "sjis.csv", &bytes);
        let mut reader = open(&path, CsvConfig::default().with_encoding("Shift_JIS").with_delimiter("|"));
        assert_eq!(reader.header()?, &["name".to_string(), "value".to_string()]);
        let records = reader.read_batch()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields(), &["ポ".to_string(), "1".to_string()]);
        assert_eq!(records[1].get(0), Some("ア"));
        Ok(())
    }

    #[test]
    fn test_utf16() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let mut content = vec![0xFF, 0xFE];
        for unit in "name,value\ncafé,1\n".encode_utf16() {
            content.extend_from_slice(&unit.to_le_bytes());
        }
        let path = write(&dir, "utf16.csv", &content);
        let mut reader = open(&path, CsvConfig::default().with_encoding("UTF-16"));
        let metadata = reader.read_meta()?.clone();
        assert_eq!(metadata.column_names(), vec!["name", "value"]);
        assert_eq!(metadata.encoding(), "UTF-16LE");
        assert_eq!(reader.read_record()?.get(0), Some("café"));
        Ok(())
    }

    #[test]
    fn test_literal_string_delimiter() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let content = NORMAL.replace(',', " ¦ ");
        let path = write(&dir, "literal.csv", content.as_bytes());
        let mut reader = open(&path, CsvConfig::default().with_delimiter(" ¦ ").with_chunk_size(10));
        let metadata = reader.read_meta()?.clone();
        assert_eq!(metadata.column_count(), 8);
        assert_eq!(metadata.delimiter(), " ¦ ");
        assert_eq!(metadata.fields()[1].field_type(), FieldType::Integer);
        let batch = reader.read_batch()?;
        assert_eq!(batch.len(), 5);
        assert_eq!(batch[2].get(2), Some("a ¦ b"));
        assert_eq!(batch[4].get(3), Some("Multi\nline"));

        let path = write(&dir, "short.csv", b"a::b\n1::2\n3\n");
        let mut reader = open(&path, CsvConfig::default().with_delimiter("::"));
        assert_eq!(reader.read_record()?.len(), 2);
        assert!(matches!(reader.read_record(), Err(Error::MalformedRecord { line: 3, .. })));
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, "normal.csv", NORMAL.as_bytes());
        let mut reader = open(&path, CsvConfig::default());
        reader.read_meta()?;
        reader.close();
        reader.close();
        assert_eq!(reader.state(), ReaderState::Closed);
        assert!(matches!(reader.read_record(), Err(Error::EndOfInput)));
        Ok(())
    }
}
