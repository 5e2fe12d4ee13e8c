use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Error;
use simple_logger::SimpleLogger;

use csv_file_sort::comparison::Comparison;
use csv_file_sort::csv_config::CsvConfig;
use csv_file_sort::order::Order;
use csv_file_sort::reader::CsvReader;
use csv_file_sort::sort::Sort;
use csv_file_sort::union::union;

fn create_input(path: &Path) -> Result<(), Error> {
    let mut content = String::from("id,city,population,updated\n");
    let cities = ["Zürich", "Oslo", "Lima", "Cairo", "Perth, WA", "Quebec \"QC\""];
    for i in 0..1000 {
        let city = cities[i % cities.len()];
        let city = if city.contains(',') || city.contains('"') {
            format!("\"{}\"", city.replace('"', "\"\""))
        } else {
            city.to_string()
        };
        content.push_str(&format!("{},{},{},2023-0{}-1{}\n", i, city, (i * 7919) % 100_000, i % 9 + 1, i % 10));
    }
    fs::write(path, content)?;
    Ok(())
}

fn preview(path: &Path) -> Result<(), Error> {
    let mut reader = CsvReader::open(path, &CsvConfig::default().with_chunk_size(5))?;
    for field in reader.read_meta()?.fields() {
        log::info!("column {}: {} {:?}", field.index(), field.name(), field.field_type());
    }
    for record in reader.read_batch()? {
        log::info!("{:?}", record.fields());
    }
    reader.close();
    Ok(())
}

fn sort_by_city(input_path: &Path, output_path: &Path) -> Result<PathBuf, Error> {
    // ascending order is the default
    let mut csv_file = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf(), 1);
    csv_file.with_chunk_size(128);
    Ok(csv_file.sort()?)
}

fn sort_by_population_descending(input_path: &Path, output_path: &Path) -> Result<PathBuf, Error> {
    let mut csv_file = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf(), 2);
    csv_file.with_order(Order::Desc);
    csv_file.with_comparison(Comparison::Typed);
    csv_file.with_chunk_size(128);
    csv_file.with_tasks(0);
    Ok(csv_file.sort()?)
}

// cargo run -r --example sort_csv_file
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;

    let input_path = PathBuf::from("./target/cities-1000.csv");
    let by_city_path = PathBuf::from("./target/cities-by-city.csv");
    let by_population_path = PathBuf::from("./target/cities-by-population.csv");
    let union_path = PathBuf::from("./target/cities-union.csv");

    create_input(&input_path)?;
    preview(&input_path)?;
    sort_by_city(&input_path, &by_city_path)?;
    sort_by_population_descending(&input_path, &by_population_path)?;
    union(&by_city_path, &by_population_path, &union_path)?;
    preview(&by_population_path)?;

    Ok(())
}
