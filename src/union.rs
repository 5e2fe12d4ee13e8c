use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Concatenate two files with the same header into `output`.
///
/// `first` is copied as is, then `second` without its header line. A line break is added
/// between the two when `first` does not end with one. Rows are not parsed. Returns the
/// number of bytes written.
///
/// # Examples
/// ```
/// use csv_file_sort::union::union;
///
/// let dir = tempfile::tempdir().unwrap();
/// let first = dir.path().join("first.csv");
/// let second = dir.path().join("second.csv");
/// let output = dir.path().join("union.csv");
/// std::fs::write(&first, "id\n1\n").unwrap();
/// std::fs::write(&second, "id\n2\n").unwrap();
///
/// union(&first, &second, &output).unwrap();
/// assert_eq!(std::fs::read_to_string(&output).unwrap(), "id\n1\n2\n");
/// ```
pub fn union(first: &Path, second: &Path, output: &Path) -> Result<u64> {
    let mut first_reader = open(first)?;
    let mut second_reader = open(second)?;
    let mut writer = BufWriter::new(File::create(output).map_err(|e| Error::io(output, e))?);

    let (mut written, last) = copy(&mut first_reader, first, &mut writer, output)?;
    if written > 0 && last != Some(b'\n') {
        writer.write_all(b"\n").map_err(|e| Error::io(output, e))?;
        written += 1;
    }

    let mut header = Vec::new();
    second_reader.read_until(b'\n', &mut header).map_err(|e| Error::io(second, e))?;
    let (copied, _) = copy(&mut second_reader, second, &mut writer, output)?;
    written += copied;

    writer.flush().map_err(|e| Error::io(output, e))?;
    log::info!(
        "Union of {} and {} written to {}, {} bytes",
        first.display(),
        second.display(),
        output.display(),
        written
    );
    Ok(written)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(
            |source| Error::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            }
        )
}

fn copy(reader: &mut BufReader<File>, path: &Path, writer: &mut impl Write, output: &Path) -> Result<(u64, Option<u8>)> {
    let mut copied = 0;
    let mut last = None;
    loop {
        let buffer = reader.fill_buf().map_err(|e| Error::io(path, e))?;
        if buffer.is_empty() {
            break;
        }
        writer.write_all(buffer).map_err(|e| Error::io(output, e))?;
        last = buffer.last().copied();
        let length = buffer.len();
        copied += length as u64;
        reader.consume(length);
    }
    Ok((copied, last))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::error::Error;
    use crate::union::union;

    #[test]
    fn test_missing_newline_between_files() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let output = dir.path().join("union.csv");
        fs::write(&first, "id,name\n1,a")?;
        fs::write(&second, "id,name\n2,b\n")?;

        let written = union(&first, &second, &output)?;
        assert_eq!(fs::read_to_string(&output)?, "id,name\n1,a\n2,b\n");
        assert_eq!(written, 16);
        Ok(())
    }

    #[test]
    fn test_empty_first_file() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let output = dir.path().join("union.csv");
        fs::write(&first, "")?;
        fs::write(&second, "id\n7\n")?;

        union(&first, &second, &output)?;
        assert_eq!(fs::read_to_string(&output)?, "7\n");
        Ok(())
    }

    #[test]
    fn test_missing_source() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first.csv");
        let output = dir.path().join("union.csv");
        fs::write(&first, "id\n1\n")?;

        let result = union(&first, &dir.path().join("missing.csv"), &output);
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
        assert!(!output.exists());
        Ok(())
    }
}
