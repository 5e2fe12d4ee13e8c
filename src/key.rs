use std::cmp::Ordering;
use std::str::FromStr;

use crate::comparison::Comparison;
use crate::field_type::{parse_double, FieldType};

/// Parsed form of a sort column value. [Key::Text] keys compare the raw field text.
/// [Key::Number] is never NaN.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Key {
    Text,
    Integer {
        i: i64
    },
    Number {
        n: f64
    },
}

impl Key {
    pub(crate) fn new(field: &str, field_type: FieldType, comparison: Comparison) -> Key {
        match comparison {
            Comparison::Ordinal => Key::Text,
            Comparison::Typed => {
                match field_type {
                    FieldType::Integer => {
                        match i64::from_str(field) {
                            Ok(i) => Key::Integer { i },
                            Err(_) => Self::number(field),
                        }
                    }
                    FieldType::Double => Self::number(field),
                    _ => Key::Text,
                }
            }
        }
    }

    fn number(field: &str) -> Key {
        match parse_double(field) {
            Some(n) if !n.is_nan() => Key::Number { n },
            _ => Key::Text,
        }
    }

    /// Compare two keys, `field` and `other_field` are the raw values the keys were built from.
    pub(crate) fn compare(&self, field: &str, other: &Key, other_field: &str) -> Ordering {
        match (self, other) {
            (Key::Text, Key::Text) => field.cmp(other_field),
            // parsed values sort before values that did not parse
            (Key::Text, _) => Ordering::Greater,
            (_, Key::Text) => Ordering::Less,
            (Key::Integer { i }, Key::Integer { i: other_i }) => i.cmp(other_i),
            (Key::Number { n }, Key::Number { n: other_n }) => n.partial_cmp(other_n).unwrap_or(Ordering::Equal),
            (Key::Integer { i }, Key::Number { n }) => compare_integer_number(*i, *n),
            (Key::Number { n }, Key::Integer { i }) => compare_integer_number(*i, *n).reverse(),
        }
    }
}

/// Exact comparison of an integer with a number, `i as f64` rounds above 2^53.
fn compare_integer_number(i: i64, n: f64) -> Ordering {
    // -2^63, the bounds of i64 are exact in f64
    const MIN: f64 = i64::MIN as f64;
    if n < MIN {
        return Ordering::Greater;
    }
    if n >= -MIN {
        return Ordering::Less;
    }
    let whole = n.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => {
            let fraction = n - whole;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ordering => ordering,
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::comparison::Comparison;
    use crate::field_type::FieldType;
    use crate::key::Key;

    fn compare(a: &str, b: &str, field_type: FieldType, comparison: Comparison) -> Ordering {
        let key_a = Key::new(a, field_type, comparison);
        let key_b = Key::new(b, field_type, comparison);
        key_a.compare(a, &key_b, b)
    }

    #[test]
    fn test_ordinal_is_lexicographic() {
        assert_eq!(compare("10", "9", FieldType::Integer, Comparison::Ordinal), Ordering::Less);
        assert_eq!(compare("B", "a", FieldType::String, Comparison::Ordinal), Ordering::Less);
        assert_eq!(compare("same", "same", FieldType::String, Comparison::Ordinal), Ordering::Equal);
    }

    #[test]
    fn test_typed_numbers() {
        assert_eq!(compare("10", "9", FieldType::Integer, Comparison::Typed), Ordering::Greater);
        assert_eq!(compare("-3", "2", FieldType::Integer, Comparison::Typed), Ordering::Less);
        assert_eq!(compare("2.5", "10", FieldType::Integer, Comparison::Typed), Ordering::Less);
        assert_eq!(compare("1e3", "999.5", FieldType::Double, Comparison::Typed), Ordering::Greater);
    }

    #[test]
    fn test_typed_unparsable_values_sort_last() {
        assert_eq!(compare("n/a", "99", FieldType::Integer, Comparison::Typed), Ordering::Greater);
        assert_eq!(compare("99", "n/a", FieldType::Double, Comparison::Typed), Ordering::Less);
        assert_eq!(compare("n/a", "n/b", FieldType::Double, Comparison::Typed), Ordering::Less);
        assert_eq!(compare("10", "9", FieldType::Date, Comparison::Typed), Ordering::Less);
    }

    #[test]
    fn test_typed_integers_and_numbers_compare_exactly() {
        let typed = |a, b| compare(a, b, FieldType::Integer, Comparison::Typed);
        // 2^53 + 1 is not representable as f64
        assert_eq!(typed("9007199254740993", "9007199254740992.0"), Ordering::Greater);
        assert_eq!(typed("9007199254740992", "9007199254740992.0"), Ordering::Equal);
        assert_eq!(typed("9007199254740991", "9007199254740992.0"), Ordering::Less);
        assert_eq!(typed("9007199254740992.0", "9007199254740993"), Ordering::Less);
        assert_eq!(typed("-2", "-2.5"), Ordering::Greater);
        assert_eq!(typed("2", "2.5"), Ordering::Less);
        assert_eq!(typed("0", "-0.0"), Ordering::Equal);
        assert_eq!(typed("-0.0", "0.0"), Ordering::Equal);
        assert_eq!(typed("9223372036854775807", "1e400"), Ordering::Less);
        assert_eq!(typed("-9223372036854775808", "-1e400"), Ordering::Greater);
        assert_eq!(typed("9223372036854775807", "9223372036854775808.0"), Ordering::Less);
        assert_eq!(typed("-9223372036854775808", "-9223372036854775808.0"), Ordering::Equal);
    }

    #[test]
    fn test_mixed_keys_sort_consistently() {
        let values = [
            "9007199254740993",
            "9007199254740992.0",
            "9007199254740992",
            "x",
            "-0.0",
            "0",
            "1.5",
            "9007199254740991",
        ];
        let mut sorted: Vec<&str> = values.to_vec();
        sorted.sort_by(|a, b| compare(a, b, FieldType::Integer, Comparison::Typed));
        assert_eq!(
            sorted,
            vec![
                "-0.0",
                "0",
                "1.5",
                "9007199254740991",
                "9007199254740992.0",
                "9007199254740992",
                "9007199254740993",
                "x",
            ]
        );
        for a in values {
            for b in values {
                for c in values {
                    let ab = compare(a, b, FieldType::Integer, Comparison::Typed);
                    let bc = compare(b, c, FieldType::Integer, Comparison::Typed);
                    if ab != Ordering::Greater && bc != Ordering::Greater {
                        assert_ne!(compare(a, c, FieldType::Integer, Comparison::Typed), Ordering::Greater, "{} {} {}", a, b, c);
                    }
                }
            }
        }
    }
}
