use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::transcode::utf8_field;

/// Parser for records whose delimiter is a string rather than a single ASCII byte.
///
/// Works on UTF-8 input. Quoting follows the same rules as the single byte path: a field that
/// starts with `"` runs to the next lone `"`, doubled quotes are literal and may span line
/// breaks. Blank lines are skipped. Every record must have as many fields as the first one.
pub(crate) struct LiteralReader<R: Read> {
    reader: BufReader<R>,
    delimiter: Vec<u8>,
    line: u64,
    width: Option<usize>,
    line_buffer: Vec<u8>,
}

impl<R: Read> LiteralReader<R> {
    pub(crate) fn new(reader: R, delimiter: &str) -> LiteralReader<R> {
        LiteralReader {
            reader: BufReader::new(reader),
            delimiter: delimiter.as_bytes().to_vec(),
            line: 0,
            width: None,
            line_buffer: Vec::new(),
        }
    }

    /// Read the next record. Returns the line it starts on and its fields.
    pub(crate) fn read_record(&mut self, path: &Path) -> Result<Option<(u64, Vec<String>)>> {
        let mut fields = Vec::new();
        let mut field = Vec::new();
        let mut quoted = false;
        let mut in_quotes = false;
        let mut start = 0;
        loop {
            self.line_buffer.clear();
            let read = self.reader
                .read_until(b'\n', &mut self.line_buffer)
                .map_err(|e| Error::io(path, e))?;
            if read == 0 {
                if start == 0 {
                    return Ok(None);
                }
                return Err(malformed(path, start, "unterminated quoted field".to_string()));
            }
            self.line += 1;
            if start == 0 {
                if is_blank(&self.line_buffer) {
                    continue;
                }
                start = self.line;
            }

            let line = &self.line_buffer;
            let mut i = 0;
            while i < line.len() {
                let byte = line[i];
                if in_quotes {
                    if byte == b'"' {
                        if line.get(i + 1) == Some(&b'"') {
                            field.push(b'"');
                            i += 2;
                            continue;
                        }
                        in_quotes = false;
                    } else {
                        field.push(byte);
                    }
                    i += 1;
                } else if line[i..].starts_with(&self.delimiter) {
                    fields.push(utf8_field(&field, path, start)?);
                    field.clear();
                    quoted = false;
                    i += self.delimiter.len();
                } else if byte == b'"' && field.is_empty() && !quoted {
                    in_quotes = true;
                    quoted = true;
                    i += 1;
                } else if byte == b'\n' || (byte == b'\r' && line.get(i + 1).map_or(true, |next| *next == b'\n')) {
                    break;
                } else {
                    field.push(byte);
                    i += 1;
                }
            }

            if !in_quotes {
                fields.push(utf8_field(&field, path, start)?);
                return match self.width {
                    Some(width) if width != fields.len() => Err(
                        malformed(path, start, format!("expected {} fields, found {}", width, fields.len()))
                    ),
                    Some(_) => Ok(Some((start, fields))),
                    None => {
                        self.width = Some(fields.len());
                        Ok(Some((start, fields)))
                    }
                };
            }
        }
    }
}

/// Write one record terminated by `\n` into `line` and then to `out`.
///
/// Fields are quoted when they contain a quote, a line break or any character of the delimiter.
/// A record with a single empty field is written as `""` so that it does not read back as a
/// blank line.
pub(crate) fn write_record<'a, W: Write>(
    out: &mut W,
    fields: impl Iterator<Item = &'a str>,
    delimiter: &str,
    line: &mut String,
) -> io::Result<()> {
    line.clear();
    let mut count = 0;
    for field in fields {
        if count > 0 {
            line.push_str(delimiter);
        }
        let needs_quotes = field.chars().any(|c| matches!(c, '"' | '\r' | '\n') || delimiter.contains(c));
        if needs_quotes {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
        count += 1;
    }
    if count == 1 && line.is_empty() {
        line.push_str("\"\"");
    }
    line.push('\n');
    out.write_all(line.as_bytes())
}

fn is_blank(line: &[u8]) -> bool {
    matches!(line, b"\n" | b"\r\n" | b"\r")
}

fn malformed(path: &Path, line: u64, reason: String) -> Error {
    Error::MalformedRecord {
        path: path.to_path_buf(),
        line,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::error::Error;
    use crate::literal::{write_record, LiteralReader};

    fn read_all(content: &str, delimiter: &str) -> Result<Vec<(u64, Vec<String>)>, Error> {
        let mut reader = LiteralReader::new(content.as_bytes(), delimiter);
        let mut records = Vec::new();
        while let Some(record) = reader.read_record(Path::new("literal.csv"))? {
            records.push(record);
        }
        Ok(records)
    }

    #[test]
    fn test_multi_character_delimiter() -> Result<(), anyhow::Error> {
        let content = "name::value\r\n\"a::b\"::1\n\n\"say \"\"hi\"\"\"::\"two\nlines\"\nc:d::3\n";
        let records = read_all(content, "::")?;
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], (1, vec!["name".to_string(), "value".to_string()]));
        assert_eq!(records[1].1, vec!["a::b", "1"]);
        assert_eq!(records[2], (4, vec!["say \"hi\"".to_string(), "two\nlines".to_string()]));
        assert_eq!(records[3], (6, vec!["c:d".to_string(), "3".to_string()]));
        Ok(())
    }

    #[test]
    fn test_field_count_and_quotes_are_checked() {
        match read_all("a||b\n1||2||3\n", "||") {
            Err(Error::MalformedRecord { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(reason, "expected 2 fields, found 3");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(read_all("a||b\n\"open||2\n", "||"), Err(Error::MalformedRecord { line: 2, .. })));
    }

    #[test]
    fn test_written_records_read_back() -> Result<(), anyhow::Error> {
        let rows: Vec<Vec<&str>> = vec![
            vec!["k", "v"],
            vec!["a:", ":b"],
            vec!["quote \"q\"", "line\nbreak"],
            vec!["", ""],
        ];
        let mut out = Vec::new();
        let mut line = String::new();
        for row in &rows {
            write_record(&mut out, row.iter().copied(), "::", &mut line)?;
        }
        let content = String::from_utf8(out)?;
        assert!(content.starts_with("k::v\n\"a:\"::\":b\"\n"));
        let records = read_all(&content, "::")?;
        let fields: Vec<Vec<String>> = records.into_iter().map(|(_, fields)| fields).collect();
        assert_eq!(fields, rows.iter().map(|row| row.iter().map(|f| f.to_string()).collect::<Vec<String>>()).collect::<Vec<_>>());

        let mut out = Vec::new();
        write_record(&mut out, [""].into_iter(), "::", &mut line)?;
        assert_eq!(out, b"\"\"\n".to_vec());
        Ok(())
    }
}
