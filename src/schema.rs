use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::domain::TVError;

/// How values of a column are compared when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Numeric,
}

impl ColumnKind {
    /// Compare two non-null values of this kind. Values that do not belong
    /// to the kind compare equal.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (self, a, b) {
            (ColumnKind::Text, Value::Text(a), Value::Text(b)) => collate(a, b),
            (ColumnKind::Numeric, Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (ColumnKind::Numeric, Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (ColumnKind::Numeric, Value::Integer(a), Value::Number(b)) => (*a as f64).total_cmp(b),
            (ColumnKind::Numeric, Value::Number(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            _ => Ordering::Equal,
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnKind::Text, Value::Text(_))
                | (ColumnKind::Numeric, Value::Number(_) | Value::Integer(_))
        )
    }
}

/// Case aware string ordering: letters are compared case folded first, on a tie
/// lowercase sorts before uppercase and code point order decides the rest.
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Range a numeric value falls into, used to color cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Mid,
    High,
}

/// Thresholds splitting a numeric column into bands: below `low`, below
/// `high`, and everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub low: f64,
    pub high: f64,
}

impl Bands {
    pub fn classify(&self, value: &Value) -> Option<Band> {
        let v = value.as_f64()?;
        Some(if v < self.low {
            Band::Low
        } else if v < self.high {
            Band::Mid
        } else {
            Band::High
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub field: String,
    pub label: String,
    pub kind: ColumnKind,
    pub shown: bool,
    pub exported: bool,
    pub bands: Option<Bands>,
}

impl ColumnDef {
    pub fn text(field: &str, label: &str) -> Self {
        Self::new(field, label, ColumnKind::Text)
    }

    pub fn numeric(field: &str, label: &str) -> Self {
        Self::new(field, label, ColumnKind::Numeric)
    }

    fn new(field: &str, label: &str, kind: ColumnKind) -> Self {
        ColumnDef {
            field: field.to_string(),
            label: label.to_string(),
            kind,
            shown: true,
            exported: true,
            bands: None,
        }
    }

    /// Only rendered in the expanded detail row.
    pub fn detail(mut self) -> Self {
        self.shown = false;
        self
    }

    pub fn not_exported(mut self) -> Self {
        self.exported = false;
        self
    }

    pub fn banded(mut self, low: f64, high: f64) -> Self {
        self.bands = Some(Bands { low, high });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, TVError> {
        if columns.is_empty() {
            return Err(TVError::SchemaMismatch("schema has no columns".into()));
        }

        let mut fields = HashSet::new();
        let mut labels = HashSet::new();
        for column in columns.iter() {
            if !fields.insert(column.field.as_str()) {
                return Err(TVError::SchemaMismatch(format!(
                    "field \"{}\" is defined twice",
                    column.field
                )));
            }
            // Export headers have to be unique to be usable as csv header
            if column.exported && !labels.insert(column.label.as_str()) {
                return Err(TVError::SchemaMismatch(format!(
                    "label \"{}\" is used by more than one exported column",
                    column.label
                )));
            }
            if let Some(bands) = column.bands {
                let unordered = matches!(
                    bands.low.partial_cmp(&bands.high),
                    None | Some(Ordering::Greater)
                );
                if column.kind != ColumnKind::Numeric || unordered {
                    return Err(TVError::SchemaMismatch(format!(
                        "bands {}..{} do not fit column \"{}\"",
                        bands.low, bands.high, column.field
                    )));
                }
            }
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.field == field)
    }

    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Indices of columns rendered in the table.
    pub fn shown(&self) -> Vec<usize> {
        self.indices(|c| c.shown)
    }

    /// Indices of columns only rendered in the detail row.
    pub fn detail(&self) -> Vec<usize> {
        self.indices(|c| !c.shown)
    }

    pub fn exported(&self) -> Vec<usize> {
        self.indices(|c| c.exported)
    }

    fn indices(&self, predicate: impl Fn(&ColumnDef) -> bool) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| predicate(c))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Turns an internal field name into a column label, `full_name` becomes `Full Name`.
pub fn humanize(field: &str) -> String {
    field
        .split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    /// Whole numbers are kept exact, wide enough for both i64 and u64 sources.
    Integer(i128),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    /// Keeps the shortest decimal form of the f32, not of its f64 widening.
    fn from(n: f32) -> Self {
        Value::Number(n.to_string().parse().unwrap_or(n as f64))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

/// Text for a single terminal line, line breaks become ` ↵ `.
pub fn single_line(s: &str) -> String {
    s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId(n.to_string())
    }
}

impl From<usize> for RecordId {
    fn from(n: usize) -> Self {
        RecordId(n.to_string())
    }
}

impl From<i32> for RecordId {
    fn from(n: i32) -> Self {
        RecordId(n.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, values: Vec<Value>) -> Self {
        Record {
            id: id.into(),
            values,
        }
    }

    pub fn value(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collate_orders_case_folded_then_lowercase_first() {
        assert_eq!(collate("Amy", "Bob"), Ordering::Less);
        assert_eq!(collate("amy", "Bob"), Ordering::Less);
        assert_eq!(collate("bob", "Bob"), Ordering::Less);
        assert_eq!(collate("Bob", "Bob"), Ordering::Equal);
        assert_eq!(collate("Bo", "Bob"), Ordering::Less);
    }

    #[test]
    fn numbers_display_in_shortest_decimal_form() {
        assert_eq!(Value::from(40000).to_string(), "40000");
        assert_eq!(Value::from(12.5).to_string(), "12.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(0.1f32).to_string(), "0.1");
    }

    #[test]
    fn integers_stay_exact_past_f64_precision() {
        let a = Value::from(9007199254740992i64);
        let b = Value::from(9007199254740993i64);
        assert_eq!(b.to_string(), "9007199254740993");
        assert_eq!(ColumnKind::Numeric.compare(&a, &b), Ordering::Less);
        assert_eq!(Value::from(u64::MAX).to_string(), "18446744073709551615");
        assert_eq!(
            ColumnKind::Numeric.compare(&Value::from(2), &Value::from(1.5)),
            Ordering::Greater
        );
    }

    #[test]
    fn single_line_marks_line_breaks() {
        assert_eq!(single_line("a\nb\r\nc"), "a ↵ b ↵ c");
        assert_eq!(single_line("plain"), "plain");
    }

    #[test]
    fn humanize_field_names() {
        assert_eq!(humanize("full_name"), "Full Name");
        assert_eq!(humanize("pexp"), "Pexp");
        assert_eq!(humanize("avail__name"), "Avail Name");
    }

    #[test]
    fn schema_rejects_duplicates() {
        let err = Schema::new(vec![
            ColumnDef::text("name", "Name"),
            ColumnDef::text("name", "Other"),
        ]);
        assert!(matches!(err, Err(TVError::SchemaMismatch(_))));

        let err = Schema::new(vec![
            ColumnDef::text("a", "Name"),
            ColumnDef::text("b", "Name"),
        ]);
        assert!(matches!(err, Err(TVError::SchemaMismatch(_))));

        // Duplicate label is fine when one of them is not exported
        let ok = Schema::new(vec![
            ColumnDef::text("a", "Name"),
            ColumnDef::text("b", "Name").not_exported(),
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn schema_column_groups() {
        let schema = Schema::new(vec![
            ColumnDef::text("name", "Name"),
            ColumnDef::text("phrase", "Catch Phrase").detail(),
            ColumnDef::numeric("salary", "Salary").not_exported(),
        ])
        .unwrap();
        assert_eq!(schema.shown(), vec![0, 2]);
        assert_eq!(schema.detail(), vec![1]);
        assert_eq!(schema.exported(), vec![0, 1]);
        assert_eq!(schema.position("salary"), Some(2));
        assert_eq!(schema.position("missing"), None);
    }

    #[test]
    fn bands_classify_numbers() {
        let bands = Bands {
            low: 50000.0,
            high: 75000.0,
        };
        assert_eq!(bands.classify(&Value::from(40000)), Some(Band::Low));
        assert_eq!(bands.classify(&Value::from(50000)), Some(Band::Mid));
        assert_eq!(bands.classify(&Value::from(74999.5)), Some(Band::Mid));
        assert_eq!(bands.classify(&Value::from(75000)), Some(Band::High));
        assert_eq!(bands.classify(&Value::Null), None);
    }

    #[test]
    fn bands_need_an_ordered_numeric_column() {
        let err = Schema::new(vec![ColumnDef::text("name", "Name").banded(1.0, 2.0)]);
        assert!(matches!(err, Err(TVError::SchemaMismatch(_))));
        let err = Schema::new(vec![ColumnDef::numeric("salary", "Salary").banded(2.0, 1.0)]);
        assert!(matches!(err, Err(TVError::SchemaMismatch(_))));
        let ok = Schema::new(vec![ColumnDef::numeric("salary", "Salary").banded(1.0, 2.0)]);
        assert!(ok.is_ok());
    }

    #[test]
    fn kind_accepts_matching_values_and_null() {
        assert!(ColumnKind::Text.accepts(&Value::from("x")));
        assert!(ColumnKind::Text.accepts(&Value::Null));
        assert!(!ColumnKind::Text.accepts(&Value::from(1)));
        assert!(ColumnKind::Numeric.accepts(&Value::from(1)));
        assert!(!ColumnKind::Numeric.accepts(&Value::from("1")));
    }
}
