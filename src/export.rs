use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::domain::TVError;
use crate::schema::Value;

/// Flat export of the visible rows: one header per exported column and one
/// row of values per visible record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ExportTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        ExportTable { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Rows as (label, value) pairs.
    pub fn mappings(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        self.rows.iter().map(|row| {
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    pub fn to_csv_string(&self) -> Result<String, TVError> {
        let mut buffer: Vec<u8> = Vec::new();
        self.write_to(&mut buffer)?;
        csv_text(buffer)
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TVError> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)?;
        info!("Exported {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut W) -> Result<(), TVError> {
        let mut df = self.to_frame()?;
        CsvWriter::new(writer)
            .include_header(true)
            .finish(&mut df)?;
        Ok(())
    }

    /// Every column becomes a string column so numbers keep their display form.
    fn to_frame(&self) -> Result<DataFrame, PolarsError> {
        let columns = self
            .headers
            .iter()
            .enumerate()
            .map(|(cidx, header)| {
                let values: Vec<Option<String>> = self
                    .rows
                    .iter()
                    .map(|row| match row.get(cidx) {
                        Some(Value::Null) | None => None,
                        Some(v) => Some(v.to_string()),
                    })
                    .collect();
                Column::new(header.as_str().into(), values)
            })
            .collect::<Vec<Column>>();
        DataFrame::new(columns)
    }
}

fn csv_text(buffer: Vec<u8>) -> Result<String, TVError> {
    String::from_utf8(buffer).map_err(|e| TVError::ExportFailed(e.to_string()))
}

/// Quote a cell for a single csv line, doubling embedded quotes.
pub fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = needs_escaping || c.chars().any(|c| c == ',' || c == '\n' || c == '\r');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ExportTable {
        ExportTable::new(
            vec!["Full Name".into(), "Per Hour Charge".into()],
            vec![
                vec![Value::from("Doe, John"), Value::from(45)],
                vec![Value::from("Amy"), Value::Null],
            ],
        )
    }

    #[test]
    fn csv_quotes_only_where_needed() {
        let csv = table().to_csv_string().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Full Name,Per Hour Charge");
        assert_eq!(lines[1], "\"Doe, John\",45");
        assert_eq!(lines[2], "Amy,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn mappings_pair_labels_with_values() {
        let t = table();
        let first = t.mappings().next().unwrap();
        assert_eq!(first[0], ("Full Name", &Value::from("Doe, John")));
        assert_eq!(first[1].0, "Per Hour Charge");
    }

    #[test]
    fn invalid_utf8_is_an_export_error() {
        let res = csv_text(vec![b'a', 0xff, b'b']);
        assert!(matches!(res, Err(TVError::ExportFailed(_))));
        assert_eq!(csv_text(b"a,b\n".to_vec()).unwrap(), "a,b\n");
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let res = table().write_csv(&dir.path().join("missing").join("out.csv"));
        assert!(matches!(res, Err(TVError::IoError(_))));
    }

    #[test]
    fn wrap_cells() {
        assert_eq!(wrap_cell_content("plain"), "plain");
        assert_eq!(wrap_cell_content("a,b"), "\"a,b\"");
        assert_eq!(wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
