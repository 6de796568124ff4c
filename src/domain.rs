use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TVError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
    #[error("unknown column \"{0}\"")]
    UnknownColumn(String),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("duplicate record id \"{0}\"")]
    DuplicateId(String),
    #[error("export failed: {0}")]
    ExportFailed(String),
}

/// What a repeated sort request on the same column cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortCycle {
    /// ascending -> descending -> ascending ...
    #[default]
    Toggle,
    /// ascending -> descending -> unsorted -> ascending ...
    TriState,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    #[setters(into)]
    pub export_path: PathBuf,
    pub sort_cycle: SortCycle,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            event_poll_time: 100,
            max_column_width: 32,
            export_path: PathBuf::from("table_data.csv"),
            sort_cycle: SortCycle::Toggle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Filter,
}

/// Actions offered for a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Deactivate,
    Activate,
    Contact,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            RowAction::Deactivate => "Deactivate",
            RowAction::Activate => "Activate",
            RowAction::Contact => "Contact",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Sort,
    Filter,
    ClearFilters,
    ToggleSelect,
    ToggleSelectAll,
    ToggleExpand,
    Export,
    CopyCell,
    CopyRow,
    RowAction(RowAction),
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  j / k, Up / Down      move row
  h / l, Left / Right   move column
  PageUp / PageDown     move page
  g / G                 first / last row

Table
  s                     sort by column (asc / desc)
  f                     filter column, Enter applies, Esc cancels
  F                     clear all filters
  Space                 select row
  a                     select / deselect all visible rows
  Enter / o             expand / collapse row details
  e                     export visible rows as csv
  c / C                 copy cell / row
  D / A / M             deactivate / activate / contact row

  ?                     this help
  Esc                   close popup
  q                     quit";
