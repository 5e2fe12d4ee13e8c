use std::cmp::Ordering;

use crate::config::Config;
use crate::key::Key;
use crate::order::Order;
use crate::record::Record;

/// A [Record] paired with the key of its sort column, ordered by the configured direction.
#[derive(Debug)]
pub(crate) struct LineRecord {
    record: Record,
    column: usize,
    key: Key,
    order: Order,
}

impl LineRecord {
    pub(crate) fn new(record: Record, config: &Config) -> LineRecord {
        let column = config.column();
        let key = Key::new(
            record.get(column).unwrap_or_default(),
            config.field_type(),
            config.comparison(),
        );
        LineRecord {
            record,
            column,
            key,
            order: config.order(),
        }
    }

    fn field(&self) -> &str {
        self.record.get(self.column).unwrap_or_default()
    }

    pub(crate) fn record(self) -> Record {
        self.record
    }
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = self.key.compare(self.field(), &other.key, other.field());
        self.order.apply(ordering)
    }
}
