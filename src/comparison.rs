/// How the values of the sort column are compared.
///
/// [Comparison::Ordinal] compares raw field text, so "10" sorts before "9" even in a column
/// detected as [Integer](crate::field_type::FieldType::Integer). [Comparison::Typed] compares
/// Integer and Double columns numerically; values that fail to parse are placed after all
/// numeric values and compared as text among themselves. Other column types always compare
/// as text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Comparison {
    /// Byte-wise comparison of the field text
    #[default]
    Ordinal,
    /// Numeric comparison for numeric columns
    Typed,
}
