use encoding_rs::{Encoding, REPLACEMENT};

use crate::error::{Error, Result};

/// Default character encoding label
pub const DEFAULT_ENCODING: &str = "UTF-8";
/// Default field delimiter
pub const DEFAULT_DELIMITER: &str = ",";
/// Default number of records returned by a batch read
pub const DEFAULT_CHUNK_SIZE: usize = 100;

const ENCODINGS: [&str; 8] = [
    "UTF-8",
    "UTF-16",
    "Shift_JIS",
    "EUC-JP",
    "ISO-8859-1",
    "ISO-8859-3",
    "ISO-8859-15",
    "windows-1252",
];

/// Reader and writer configuration for delimited text files.
///
/// # Examples
/// ```
/// use csv_file_sort::csv_config::CsvConfig;
///
/// let config = CsvConfig::default()
///     .with_delimiter(";")
///     .with_encoding("windows-1252")
///     .with_chunk_size(500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvConfig {
    encoding: String,
    delimiter: String,
    chunk_size: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            encoding: DEFAULT_ENCODING.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CsvConfig {
    /// Encoding labels commonly offered to users.
    pub fn encodings() -> &'static [&'static str] {
        &ENCODINGS
    }

    /// Set the character encoding by its label, for example "UTF-8" or "Shift_JIS".
    pub fn with_encoding(mut self, encoding: &str) -> CsvConfig {
        self.encoding = encoding.to_string();
        self
    }

    /// Set the field delimiter, a single character or a literal string such as `"::"`.
    pub fn with_delimiter(mut self, delimiter: &str) -> CsvConfig {
        self.delimiter = delimiter.to_string();
        self
    }

    /// Set the maximal number of records returned by a batch read.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> CsvConfig {
        self.chunk_size = chunk_size;
        self
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Check the configuration without touching any file.
    pub fn validate(&self) -> Result<()> {
        self.resolve_encoding()?;
        if self.delimiter.is_empty() || self.delimiter.contains(|c: char| matches!(c, '"' | '\r' | '\n')) {
            return Err(
                Error::Config(
                    format!("delimiter must not be empty or contain a quote or a line break, got {:?}", self.delimiter)
                )
            );
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub(crate) fn resolve_encoding(&self) -> Result<&'static Encoding> {
        let encoding = Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| Error::Config(format!("unknown encoding: {}", self.encoding)))?;
        if encoding == REPLACEMENT {
            return Err(Error::Config(format!("unsupported encoding: {}", self.encoding)));
        }
        Ok(encoding)
    }

    /// The delimiter as a byte when it is a single ASCII character. Records are decoded to
    /// UTF-8 before they are split, so any other delimiter is matched as a string.
    pub(crate) fn delimiter_byte(&self) -> Option<u8> {
        match self.delimiter.as_bytes() {
            [byte] => Some(*byte),
            _ => None,
        }
    }
}
