use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use data_encoding::HEXLOWER;
use rand::Rng;
use simple_logger::SimpleLogger;

pub const HEADER: &str = "key,group,name,amount,seq";

const NAMES: [&str; 8] = [
    "Smith",
    "O'Neil",
    "Doe, Jane",
    "say \"hi\"",
    "two\nlines",
    "Ünïcode",
    "",
    "plain",
];

pub fn setup() {
    // every test binary calls setup from several tests, only the first init succeeds
    let _ = SimpleLogger::new().with_level(log::LevelFilter::Warn).init();

    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(format!("{}.csv", name));
    result
}

/// Write `rows` random records: a unique hex key, a small integer group with many
/// duplicates, a name that often needs quoting, a decimal amount and the row number.
#[allow(dead_code)]
pub fn create_random_csv(path: &Path, rows: usize) -> Result<(), anyhow::Error> {
    let mut rng = rand::thread_rng();
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    writer.write_record(HEADER.split(','))?;
    for seq in 0..rows {
        let key = HEXLOWER.encode(&rng.gen::<[u8; 8]>());
        let group = rng.gen_range(0..20).to_string();
        let name = NAMES[rng.gen_range(0..NAMES.len())];
        let amount = format!("{}.{:02}", rng.gen_range(-500..5000), rng.gen_range(0..100));
        writer.write_record(&[key, group, name.to_string(), amount, seq.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[allow(dead_code)]
pub fn read_records(path: &Path) -> Result<Vec<Vec<String>>, anyhow::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_string).collect());
    }
    Ok(records)
}

#[allow(dead_code)]
pub fn read_lines(path: &Path) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().collect::<Result<Vec<String>, std::io::Error>>()?;
    Ok(lines)
}

#[allow(dead_code)]
pub fn write_lines(path: &Path, lines: &[&str]) -> Result<(), anyhow::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}
