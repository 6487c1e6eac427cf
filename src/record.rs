use crate::types::RowValues;

/// One column of a record: its metadata and, when read from a row, its value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlField {
    name: String,
    table_name: String,
    type_name: String,
    value: RowValues,
    default_value: RowValues,
    required: Option<bool>,
    auto_value: bool,
    generated: bool,
}

impl SqlField {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generated: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: RowValues) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    #[must_use]
    pub fn with_default_value(mut self, value: RowValues) -> Self {
        self.default_value = value;
        self
    }

    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    #[must_use]
    pub fn with_auto_value(mut self, auto_value: bool) -> Self {
        self.auto_value = auto_value;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared column type as the engine reports it (may be empty).
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn value(&self) -> &RowValues {
        &self.value
    }

    pub fn set_value(&mut self, value: RowValues) {
        self.value = value;
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    #[must_use]
    pub fn default_value(&self) -> &RowValues {
        &self.default_value
    }

    /// `None` when the engine cannot tell whether the column is NOT NULL.
    #[must_use]
    pub fn required(&self) -> Option<bool> {
        self.required
    }

    #[must_use]
    pub fn is_auto_value(&self) -> bool {
        self.auto_value
    }

    /// Whether generated SQL (`Driver::sql_statement`) includes this field.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn set_generated(&mut self, generated: bool) {
        self.generated = generated;
    }
}

/// An ordered list of fields: a row, or the shape of a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlRecord {
    fields: Vec<SqlField>,
}

impl SqlRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_fields(fields: Vec<SqlField>) -> Self {
        Self { fields }
    }

    /// Builds a record from column names and one row of values; missing values are NULL.
    #[must_use]
    pub fn from_row(column_names: &[String], values: &[RowValues]) -> Self {
        let fields = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                SqlField::new(name.clone()).with_value(values.get(i).cloned().unwrap_or_default())
            })
            .collect();
        Self { fields }
    }

    pub fn append(&mut self, field: SqlField) {
        self.fields.push(field);
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> &[SqlField] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, index: usize) -> Option<&SqlField> {
        self.fields.get(index)
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut SqlField> {
        self.fields.get_mut(index)
    }

    /// Index of the first field named `name`. Falls back to a case-insensitive match.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|f| f.name.eq_ignore_ascii_case(name))
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    #[must_use]
    pub fn value(&self, index: usize) -> Option<&RowValues> {
        self.fields.get(index).map(SqlField::value)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.index_of(name).and_then(|idx| self.value(idx))
    }

    pub fn set_value(&mut self, index: usize, value: RowValues) {
        if let Some(field) = self.fields.get_mut(index) {
            field.set_value(value);
        }
    }

    pub fn clear_values(&mut self) {
        for field in &mut self.fields {
            field.set_value(RowValues::Null);
        }
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(SqlField::name).collect()
    }
}

/// A named index over a subset of a table's fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlIndex {
    name: String,
    cursor_name: String,
    record: SqlRecord,
    descending: Vec<bool>,
}

impl SqlIndex {
    #[must_use]
    pub fn new(cursor_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cursor_name: cursor_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn cursor_name(&self) -> &str {
        &self.cursor_name
    }

    pub fn append(&mut self, field: SqlField, descending: bool) {
        self.record.append(field);
        self.descending.push(descending);
    }

    #[must_use]
    pub fn record(&self) -> &SqlRecord {
        &self.record
    }

    #[must_use]
    pub fn is_descending(&self, index: usize) -> bool {
        self.descending.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}
