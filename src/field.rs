use crate::field_type::FieldType;

/// Defines a column of a delimited text file.
///
/// A source's schema is the list of its fields in header order. The field type is inferred from
/// the first data record and is a hint only, later values may not match it.
///
/// # Examples
/// ```
/// use csv_file_sort::field::Field;
/// use csv_file_sort::field_type::FieldType;
/// let field = Field::new(2, FieldType::Integer)
///     .with_name("Age".to_string());
/// assert_eq!(field.index(), 2);
/// assert_eq!(field.name(), "Age");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    index: usize,
    field_type: FieldType,
}

impl Field {
    /// Create a new [Field]
    ///
    /// # Arguments
    /// * `index` - the index of the column, starting at 0
    /// * `field_type` - the type of the column. See [FieldType] for supported types
    pub fn new(
        index: usize,
        field_type: FieldType,
    ) -> Field {
        Field {
            name: String::new(),
            index,
            field_type,
        }
    }

    /// Get the name for this field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the index for this field.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the [FieldType] for this field.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Specify a name for this field
    pub fn with_name(mut self, name: String) -> Field {
        self.name = name;
        self
    }
}
