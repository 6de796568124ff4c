use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::dataset::Dataset;
use crate::domain::SortCycle;
use crate::export::ExportTable;
use crate::schema::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: Option<String>,
    pub direction: SortDirection,
}

/// Header arrow shown for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    None,
    Up,
    Down,
}

impl SortIndicator {
    pub fn symbol(&self) -> &'static str {
        match self {
            SortIndicator::None => "",
            SortIndicator::Up => "↑",
            SortIndicator::Down => "↓",
        }
    }
}

/// Field name -> filter text. Empty text means no constraint.
pub type FilterSpec = HashMap<String, String>;

/// Owns all interactive state of a table: sort, filters, selection and
/// expanded rows. The visible rows are always derived from the dataset, the
/// applied filters and the sort spec, never edited directly.
pub struct TableController {
    dataset: Arc<Dataset>,
    sort_cycle: SortCycle,
    sort: SortSpec,
    filters: FilterSpec,
    applied_filters: FilterSpec,
    filtered: Arc<Vec<usize>>, // Dataset indices passing the applied filters, in dataset order
    visible: Arc<Vec<usize>>,  // `filtered` in sort order
    selected: HashSet<RecordId>,
    expanded: HashSet<RecordId>,
}

impl TableController {
    pub fn new(dataset: Arc<Dataset>, sort_cycle: SortCycle) -> Self {
        let all: Arc<Vec<usize>> = Arc::new((0..dataset.len()).collect());
        TableController {
            dataset,
            sort_cycle,
            sort: SortSpec::default(),
            filters: FilterSpec::new(),
            applied_filters: FilterSpec::new(),
            filtered: Arc::clone(&all),
            visible: all,
            selected: HashSet::new(),
            expanded: HashSet::new(),
        }
    }

    // -------------------- Operations ---------------------- //

    /// Sort by `key`. Asking again for the current ascending key flips it to
    /// descending, any other request sorts ascending by `key`.
    pub fn set_sort(&mut self, key: &str) {
        let same_key = self.sort.key.as_deref() == Some(key);
        let direction = match (same_key, self.sort.direction, self.sort_cycle) {
            (true, SortDirection::Ascending, _) => SortDirection::Descending,
            (true, SortDirection::Descending, SortCycle::TriState) => SortDirection::None,
            _ => SortDirection::Ascending,
        };

        self.sort = match direction {
            SortDirection::None => SortSpec::default(),
            direction => SortSpec {
                key: Some(key.to_string()),
                direction,
            },
        };
        debug!("Sort spec is now {:?}", self.sort);
        self.apply_sort();
    }

    /// Update the filter text of one field. The visible rows stay untouched
    /// until `apply_filters` is called.
    pub fn set_filter(&mut self, field: &str, text: &str) {
        if self.dataset.schema().position(field).is_none() {
            warn!("Ignoring filter for unknown field \"{field}\"");
            return;
        }
        trace!("Filter \"{field}\" set to \"{text}\"");
        self.filters.insert(field.to_string(), text.to_string());
    }

    /// Filter the original dataset with every non empty constraint and apply
    /// the active sort to the result.
    pub fn apply_filters(&mut self) {
        let start_time = Instant::now();
        let schema = self.dataset.schema();

        // (column index, lowercased needle) for every active constraint
        let constraints: Vec<(usize, String)> = self
            .filters
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .filter_map(|(field, text)| schema.position(field).map(|c| (c, text.to_lowercase())))
            .collect();

        let records = self.dataset.records();
        let filtered: Vec<usize> = if constraints.is_empty() {
            (0..records.len()).collect()
        } else {
            (0..records.len())
                .into_par_iter()
                .filter(|&ridx| Self::matches(&records[ridx], &constraints))
                .collect()
        };

        debug!(
            "Filtering with {} constraints kept {}/{} records in {}ms",
            constraints.len(),
            filtered.len(),
            records.len(),
            start_time.elapsed().as_millis()
        );

        self.applied_filters = self.filters.clone();
        self.filtered = Arc::new(filtered);
        self.apply_sort();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.apply_filters();
    }

    /// Select every visible row, or clear the selection if that is already the case.
    pub fn toggle_select_all(&mut self) {
        if self.all_selected() {
            self.selected.clear();
        } else {
            self.selected = self.visible_rows().map(|r| r.id.clone()).collect();
        }
        trace!("{} rows selected", self.selected.len());
    }

    pub fn toggle_row_selection(&mut self, id: &RecordId) {
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
    }

    pub fn toggle_row_expansion(&mut self, id: &RecordId) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
        }
    }

    /// Exported columns of the visible rows, in visible order.
    pub fn export_rows(&self) -> ExportTable {
        let schema = self.dataset.schema();
        let columns = schema.exported();
        let headers = columns
            .iter()
            .map(|&c| schema.columns()[c].label.clone())
            .collect();
        let rows = self
            .visible_rows()
            .map(|r| columns.iter().map(|&c| r.value(c).clone()).collect())
            .collect();
        ExportTable::new(headers, rows)
    }

    // -------------------- Read model ---------------------- //

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn visible_rows(&self) -> impl ExactSizeIterator<Item = &Record> + '_ {
        let records = self.dataset.records();
        self.visible.iter().map(move |&ridx| &records[ridx])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_record(&self, pos: usize) -> Option<&Record> {
        self.visible
            .get(pos)
            .map(|&ridx| &self.dataset.records()[ridx])
    }

    /// Position of a record among the visible rows.
    pub fn position_of(&self, id: &RecordId) -> Option<usize> {
        self.visible_rows().position(|r| &r.id == id)
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub fn sort_indicator(&self, field: &str) -> SortIndicator {
        if self.sort.key.as_deref() != Some(field) {
            return SortIndicator::None;
        }
        match self.sort.direction {
            SortDirection::None => SortIndicator::None,
            SortDirection::Ascending => SortIndicator::Up,
            SortDirection::Descending => SortIndicator::Down,
        }
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn filter_text(&self, field: &str) -> &str {
        self.filters.get(field).map(String::as_str).unwrap_or("")
    }

    /// True if filter texts were edited since the last `apply_filters`.
    pub fn has_pending_filters(&self) -> bool {
        let active = |spec: &FilterSpec| -> HashMap<String, String> {
            spec.iter()
                .filter(|(_, t)| !t.is_empty())
                .map(|(f, t)| (f.clone(), t.clone()))
                .collect()
        };
        active(&self.filters) != active(&self.applied_filters)
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    pub fn is_expanded(&self, id: &RecordId) -> bool {
        self.expanded.contains(id)
    }

    pub fn selected_len(&self) -> usize {
        self.selected.len()
    }

    /// True if the selection is exactly the non empty set of visible rows.
    pub fn all_selected(&self) -> bool {
        !self.visible.is_empty()
            && self.selected.len() == self.visible.len()
            && self.visible_rows().all(|r| self.selected.contains(&r.id))
    }

    // -------------------- Derivation ---------------------- //

    fn matches(record: &Record, constraints: &[(usize, String)]) -> bool {
        constraints.iter().all(|(column, needle)| {
            let value = record.value(*column);
            !value.is_null() && value.to_string().to_lowercase().contains(needle.as_str())
        })
    }

    fn apply_sort(&mut self) {
        let (key, descending) = match (&self.sort.key, self.sort.direction) {
            (Some(key), SortDirection::Ascending) => (key, false),
            (Some(key), SortDirection::Descending) => (key, true),
            _ => {
                self.visible = Arc::clone(&self.filtered);
                return;
            }
        };

        let schema = self.dataset.schema();
        let Some(column) = schema.position(key) else {
            warn!("Sorting by unknown field \"{key}\" keeps the current order");
            self.visible = Arc::clone(&self.filtered);
            return;
        };
        let kind = schema.columns()[column].kind;
        let records = self.dataset.records();

        // Vec::sort_by is stable, rows with equal keys keep their dataset order
        let mut rows: Vec<usize> = self.filtered.as_ref().clone();
        rows.sort_by(|&a, &b| {
            let (va, vb) = (records[a].value(column), records[b].value(column));
            match (va.is_null(), vb.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater, // Missing values always come last
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = kind.compare(va, vb);
                    if descending { ord.reverse() } else { ord }
                }
            }
        });
        self.visible = Arc::new(rows);
    }
}
