use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

use crate::domain::TVError;
use crate::schema::{
    Bands, ColumnDef, ColumnKind, Record, RecordId, Schema, Value, humanize, single_line,
};

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

/// Options applied while turning a data file into a typed dataset.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Column supplying record ids. Without it ids are the 1-based row number.
    pub id_column: Option<String>,
    /// Field name -> label overrides.
    pub labels: HashMap<String, String>,
    /// Fields only rendered in the expanded detail row.
    pub detail: Vec<String>,
    pub hidden_from_export: Vec<String>,
    /// Field name -> color bands of a numeric column.
    pub bands: HashMap<String, Bands>,
}

/// A fully loaded, validated and immutable record set.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    schema: Schema,
    records: Vec<Record>,
    widths: Vec<usize>, // Widest single line rendering per column
}

struct LoadedColumn {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Dataset {
    pub fn new(name: &str, schema: Schema, records: Vec<Record>) -> Result<Self, TVError> {
        let mut ids: HashSet<&RecordId> = HashSet::with_capacity(records.len());
        for record in records.iter() {
            if record.values.len() != schema.len() {
                return Err(TVError::SchemaMismatch(format!(
                    "record \"{}\" has {} values, expected {}",
                    record.id,
                    record.values.len(),
                    schema.len()
                )));
            }
            for (column, value) in schema.columns().iter().zip(record.values.iter()) {
                if !column.kind.accepts(value) {
                    return Err(TVError::SchemaMismatch(format!(
                        "record \"{}\" has a {:?} value for {:?} column \"{}\"",
                        record.id, value, column.kind, column.field
                    )));
                }
            }
            if !ids.insert(&record.id) {
                return Err(TVError::DuplicateId(record.id.to_string()));
            }
        }

        let widths = (0..schema.len())
            .into_par_iter()
            .map(|cidx| {
                records
                    .iter()
                    .map(|r| single_line(&r.value(cidx).to_string()).chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        Ok(Dataset {
            name: name.to_string(),
            schema,
            records,
            widths,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn value_width(&self, column: usize) -> usize {
        self.widths.get(column).copied().unwrap_or(0)
    }

    #[instrument(skip(options))]
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self, TVError> {
        let file_type = Self::check_file(path)?;
        let frame = match file_type {
            FileType::CSV => Self::load_csv(path)?,
            FileType::PARQUET => Self::load_parquet(path)?,
            FileType::ARROW => Self::load_arrow(path)?,
        };

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();

        let start_time = Instant::now();
        let df = frame.collect()?;
        let dataset = Self::from_frame(&name, &df, options)?;
        let data_loading_duration = start_time.elapsed().as_millis();
        info!(
            "Loaded {} records with {} columns from {} in {data_loading_duration}ms",
            dataset.len(),
            dataset.schema.len(),
            name
        );
        Ok(dataset)
    }

    /// Convert a collected data frame into a dataset.
    /// Each column is converted in its own rayon task.
    pub fn from_frame(name: &str, df: &DataFrame, options: &LoadOptions) -> Result<Self, TVError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        let referenced = options
            .id_column
            .iter()
            .chain(options.labels.keys())
            .chain(options.detail.iter())
            .chain(options.hidden_from_export.iter())
            .chain(options.bands.keys());
        for field in referenced {
            if !names.contains(field) {
                return Err(TVError::UnknownColumn(field.clone()));
            }
        }

        let ids: Vec<RecordId> = match &options.id_column {
            Some(id_column) => Self::load_ids(df, id_column)?,
            None => (1..=df.height()).map(RecordId::from).collect(),
        };

        let c_: Result<Vec<LoadedColumn>, PolarsError> = names
            .par_iter()
            .filter(|name| options.id_column.as_ref() != Some(*name))
            .map(|name| Self::load_column(df, name))
            .collect();
        let columns = c_?;

        let defs = columns
            .iter()
            .map(|c| {
                let label = options
                    .labels
                    .get(&c.name)
                    .cloned()
                    .unwrap_or_else(|| humanize(&c.name));
                ColumnDef {
                    field: c.name.clone(),
                    label,
                    kind: c.kind,
                    shown: !options.detail.contains(&c.name),
                    exported: !options.hidden_from_export.contains(&c.name),
                    bands: options.bands.get(&c.name).copied(),
                }
            })
            .collect::<Vec<ColumnDef>>();
        for def in defs.iter() {
            debug!("Column: {:?}", def);
        }
        let schema = Schema::new(defs)?;

        // Transpose the column data into records
        let mut iters: Vec<std::vec::IntoIter<Value>> =
            columns.into_iter().map(|c| c.values.into_iter()).collect();
        let records = ids
            .into_iter()
            .map(|id| {
                let values = iters
                    .iter_mut()
                    .map(|it| it.next().unwrap_or(Value::Null))
                    .collect();
                Record { id, values }
            })
            .collect();

        Self::new(name, schema, records)
    }

    /// Ids go through their string form so integer ids keep every digit.
    fn load_ids(df: &DataFrame, id_column: &str) -> Result<Vec<RecordId>, TVError> {
        let column = df.column(id_column)?.cast(&DataType::String)?;
        column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(id) => Ok(RecordId::from(id)),
                None => Err(TVError::LoadingFailed(format!(
                    "row {} has no value in id column \"{id_column}\"",
                    row + 1
                ))),
            })
            .collect()
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
        let column = df.column(col_name)?;
        let dtype = column.dtype();
        let kind = if Self::is_numeric_type(dtype) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        };
        trace!("Converting column \"{col_name}\" of {dtype:?} as {kind:?}");

        let values = match dtype {
            DataType::Float64 => column
                .f64()?
                .into_iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect(),
            DataType::Float32 => column
                .f32()?
                .into_iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect(),
            DataType::UInt64 => column
                .u64()?
                .into_iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect(),
            _ if kind == ColumnKind::Numeric => column
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect(),
            // Text is stored as is, line breaks are only replaced when rendered
            _ => column
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect(),
        };

        Ok(LoadedColumn {
            name: col_name.to_string(),
            kind,
            values,
        })
    }

    fn is_numeric_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
        )
    }

    fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(TVError::UnknownFileType),
        }
    }

    fn check_file(path: &Path) -> Result<FileType, TVError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TVError::FileNotFound,
            ErrorKind::PermissionDenied => TVError::PermissionDenied,
            _ => TVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TVError::LoadingFailed("Not a file!".into()));
        }
        debug!("File size {} bytes", metadata.len());
        Self::detect_file_type(path)
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, TVError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| TVError::LoadingFailed(format!("cannot expand \"{path}\": {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
