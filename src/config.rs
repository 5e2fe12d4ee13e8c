use std::path::PathBuf;

use crate::comparison::Comparison;
use crate::csv_config::CsvConfig;
use crate::field_type::FieldType;
use crate::order::Order;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    tmp_suffix: String,
    tasks: usize,
    queue_size: usize,
    csv_config: CsvConfig,
    header: Vec<String>,
    column: usize,
    field_type: FieldType,
    comparison: Comparison,
    order: Order,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tmp: PathBuf,
        tmp_prefix: String,
        tmp_suffix: String,
        tasks: usize,
        csv_config: CsvConfig,
        header: Vec<String>,
        column: usize,
        field_type: FieldType,
        comparison: Comparison,
        order: Order,
    ) -> Config {
        // a wave never holds more commands than there are workers
        let queue_size = tasks;
        Config {
            tmp,
            tmp_prefix,
            tmp_suffix,
            tasks,
            queue_size,
            csv_config,
            header,
            column,
            field_type,
            comparison,
            order,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub(crate) fn tmp_suffix(&self) -> &String {
        &self.tmp_suffix
    }

    pub(crate) fn tasks(&self) -> usize {
        self.tasks
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn csv_config(&self) -> &CsvConfig {
        &self.csv_config
    }

    pub(crate) fn header(&self) -> &Vec<String> {
        &self.header
    }

    pub(crate) fn column(&self) -> usize {
        self.column
    }

    pub(crate) fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub(crate) fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub(crate) fn order(&self) -> Order {
        self.order
    }
}
