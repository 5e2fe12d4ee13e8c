use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use encoding_rs::{CoderResult, Encoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};

use crate::error::{Error, Result};

const ENCODE_BUFFER_SIZE: usize = 8 * 1024;

/// A file decoded to UTF-8 while it is read.
pub(crate) type DecodedFile = DecodeReaderBytes<File, Vec<u8>>;

/// Wrap `file` so that reads return UTF-8.
///
/// UTF-8 input is passed through unchanged and validated per field by the caller. Other
/// encodings are transcoded, malformed sequences become U+FFFD. A byte order mark takes
/// precedence over `encoding` and is removed.
pub(crate) fn decoding_reader(file: File, encoding: &'static Encoding) -> DecodedFile {
    DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .utf8_passthru(true)
        .bom_override(true)
        .strip_bom(true)
        .build(file)
}

pub(crate) fn utf8_field(bytes: &[u8], path: &Path, line: u64) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(
            |e| Error::MalformedRecord {
                path: path.to_path_buf(),
                line,
                reason: format!("field is not valid UTF-8: {}", e),
            }
        )
}

enum Target {
    Utf8,
    Utf16 {
        big_endian: bool,
    },
    Legacy(Encoder),
}

/// Accepts UTF-8 and writes it to `inner` in the target encoding.
///
/// UTF-16 output starts with a byte order mark. Characters the target encoding cannot represent
/// are written as numeric character references.
pub(crate) struct EncodingWriter<W: Write> {
    inner: W,
    target: Target,
    pending: Vec<u8>,
    encoded: Vec<u8>,
}

impl<W: Write> EncodingWriter<W> {
    pub(crate) fn new(mut inner: W, encoding: &'static Encoding) -> io::Result<EncodingWriter<W>> {
        let target = if encoding == UTF_8 {
            Target::Utf8
        } else if encoding == UTF_16LE {
            inner.write_all(&[0xFF, 0xFE])?;
            Target::Utf16 { big_endian: false }
        } else if encoding == UTF_16BE {
            inner.write_all(&[0xFE, 0xFF])?;
            Target::Utf16 { big_endian: true }
        } else {
            Target::Legacy(encoding.new_encoder())
        };
        Ok(
            EncodingWriter {
                inner,
                target,
                pending: Vec::new(),
                encoded: Vec::new(),
            }
        )
    }

    fn encode(&mut self, text: &str) -> io::Result<()> {
        let EncodingWriter { inner, target, encoded, .. } = self;
        match target {
            Target::Utf8 => inner.write_all(text.as_bytes()),
            Target::Utf16 { big_endian } => {
                encoded.clear();
                for unit in text.encode_utf16() {
                    let bytes = if *big_endian { unit.to_be_bytes() } else { unit.to_le_bytes() };
                    encoded.extend_from_slice(&bytes);
                }
                inner.write_all(encoded)
            }
            Target::Legacy(encoder) => {
                encoded.resize(ENCODE_BUFFER_SIZE, 0);
                let mut input = text;
                loop {
                    // every record ends with an ASCII line break, stateful encoders are back in
                    // their initial state at record boundaries
                    let (result, read, written, _) = encoder.encode_from_utf8(input, encoded, false);
                    inner.write_all(&encoded[..written])?;
                    input = &input[read..];
                    match result {
                        CoderResult::InputEmpty => return Ok(()),
                        CoderResult::OutputFull => continue,
                    }
                }
            }
        }
    }
}

impl<W: Write> Write for EncodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Target::Utf8 = self.target {
            self.inner.write_all(buf)?;
            return Ok(buf.len());
        }

        // a character may be split between two writes, the incomplete tail waits in `pending`
        let mut pending = std::mem::take(&mut self.pending);
        pending.extend_from_slice(buf);
        let valid = match std::str::from_utf8(&pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        let (text, rest) = pending.split_at(valid);
        let text = std::str::from_utf8(text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.encode(text)?;
        self.pending = rest.to_vec();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
