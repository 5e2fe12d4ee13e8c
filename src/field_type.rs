use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

const DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%a, %d %b %Y",
    "%B %d, %Y",
    "%Y%m%d",
    "%d%m%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
];

const DATE_TIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.3fZ",
    "%B %d, %Y %H:%M:%S",
    "%Y%m%d%H%M%S",
];

/// Field type, detected from a sample value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed 64 bit integer
    Integer,
    /// 64 bit floating point number
    Double,
    /// "true" or "false", ignoring case
    Boolean,
    /// Date or date-time in one of the common formats
    Date,
    /// Anything else
    String,
}

impl FieldType {
    /// Detect the type of a single value.
    ///
    /// Types are tried in the order Integer, Double, Boolean, Date and the first match wins,
    /// String is the fallback. Dates are parsed strictly, the complete value must match one of
    /// the supported formats and must be a valid calendar date.
    ///
    /// # Examples
    /// ```
    /// use csv_file_sort::field_type::FieldType;
    ///
    /// assert_eq!(FieldType::detect("1"), FieldType::Integer);
    /// assert_eq!(FieldType::detect("1.5"), FieldType::Double);
    /// assert_eq!(FieldType::detect("false"), FieldType::Boolean);
    /// assert_eq!(FieldType::detect("2024-12-12"), FieldType::Date);
    /// assert_eq!(FieldType::detect("false1"), FieldType::String);
    /// ```
    pub fn detect(value: &str) -> FieldType {
        if is_integer(value) {
            FieldType::Integer
        } else if is_double(value) {
            FieldType::Double
        } else if is_boolean(value) {
            FieldType::Boolean
        } else if is_date(value) {
            FieldType::Date
        } else {
            FieldType::String
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Double)
    }
}

fn decimal() -> &'static Regex {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    DECIMAL.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap()
    })
}

fn is_integer(value: &str) -> bool {
    i64::from_str(value).is_ok()
}

pub(crate) fn parse_double(value: &str) -> Option<f64> {
    if decimal().is_match(value) {
        f64::from_str(value).ok()
    } else {
        None
    }
}

fn is_double(value: &str) -> bool {
    parse_double(value).is_some()
}

fn is_boolean(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
}

fn is_date(value: &str) -> bool {
    DATE_FORMATS.iter().any(|format| NaiveDate::parse_from_str(value, format).is_ok())
        || DATE_TIME_FORMATS.iter().any(|format| NaiveDateTime::parse_from_str(value, format).is_ok())
        || DateTime::parse_from_rfc2822(value).is_ok()
}
