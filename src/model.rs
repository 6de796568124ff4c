use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::dataset::Dataset;
use crate::domain::{CMDMode, HELP_TEXT, Message, RowAction, TVConfig, TVError};
use crate::export::wrap_cell_content;
use crate::inputter::{InputResult, Inputter};
use crate::schema::{Band, RecordId, single_line};
use crate::table::{SortIndicator, TableController};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, ROW_PREFIX_WIDTH, SORT_INDICATOR_WIDTH,
    TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub label: String,
    pub width: usize,
    pub indicator: SortIndicator,
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: RecordId,
    pub cells: Vec<String>,
    pub bands: Vec<Option<Band>>, // Color band per cell
    pub selected: bool,
    pub expanded: bool,
    pub detail: Vec<(String, String)>, // (label, value) lines of an expanded row
}

impl RowView {
    pub fn height(&self) -> usize {
        1 + self.detail.len()
    }
}

pub struct UIData {
    pub name: String,
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<RowView>,
    pub nrows: usize, // Number of visible rows in the table
    pub total_rows: usize,
    pub nselected: usize,
    pub all_selected: bool,
    pub filters_pending: bool,
    pub selected_row: usize, // Index into `rows`
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub last_update: Instant,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub cmd_label: String,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            total_rows: 0,
            nselected: 0,
            all_selected: false,
            filters_pending: false,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            last_update: Instant::now(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            cmd_label: String::new(),
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub statusline_width: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(ROW_PREFIX_WIDTH),
            table_height: ui_height.saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT + TITLE_HEIGHT),
            statusline_width: ui_width,
            statusline_height: CMDLINE_HEIGH,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: TableController,
    shown_columns: Vec<usize>, // Schema indices of the table columns
    column_widths: Vec<usize>, // Render width per shown column
    visible_columns: Vec<usize>, // Idx into shown_columns that fit on screen
    curser_row: usize,           // Position in the visible rows
    offset_row: usize,
    curser_column: usize, // Idx into visible_columns
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    cmd_field: Option<String>,
    filter_backup: String,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_row_action: Option<(RowAction, RecordId)>,
}

impl Model {
    pub fn init(
        config: &TVConfig,
        dataset: Dataset,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, TVError> {
        let dataset = Arc::new(dataset);
        let schema = dataset.schema();
        let shown_columns = schema.shown();
        if shown_columns.is_empty() {
            return Err(TVError::SchemaMismatch(
                "at least one column has to be shown in the table".into(),
            ));
        }
        let column_widths = shown_columns
            .iter()
            .map(|&c| {
                let label_width = schema.columns()[c].label.chars().count() + SORT_INDICATOR_WIDTH;
                let width = std::cmp::max(label_width, dataset.value_width(c)) + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, config.max_column_width)
            })
            .collect();

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            table: TableController::new(Arc::clone(&dataset), config.sort_cycle),
            shown_columns,
            column_widths,
            visible_columns: Vec::new(),
            curser_row: 0,
            offset_row: 0,
            curser_column: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            cmd_field: None,
            filter_backup: String::new(),
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
            last_row_action: None,
        };
        model.set_status_message(format!(
            "Loaded {} records, press ? for help",
            dataset.len()
        ));
        model.update_table_data();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn table(&self) -> &TableController {
        &self.table
    }

    /// The most recent row action and the record it was applied to.
    pub fn last_row_action(&self) -> Option<&(RowAction, RecordId)> {
        self.last_row_action.as_ref()
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MovePageDown => self.move_selection_down(self.uilayout.table_height.max(1)),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height.max(1)),
                Message::MoveBeginning => self.move_selection_to(0),
                Message::MoveEnd => {
                    self.move_selection_to(self.table.visible_len().saturating_sub(1))
                }
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::Sort => self.sort_current_column(),
                Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                Message::ClearFilters => self.clear_filters(),
                Message::ToggleSelect => self.toggle_current_selection(),
                Message::ToggleSelectAll => self.toggle_select_all(),
                Message::ToggleExpand => self.toggle_current_expansion(),
                Message::Export => self.export(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::RowAction(action) => self.row_action(action),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
            self.uidata.show_popup = false;
            self.uidata.last_update = Instant::now();
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.update_table_data();
    }

    fn current_field(&self) -> Option<String> {
        let shown_idx = *self.visible_columns.get(self.curser_column)?;
        let column = self.shown_columns[shown_idx];
        Some(self.table.dataset().schema().columns()[column].field.clone())
    }

    fn current_id(&self) -> Option<RecordId> {
        self.table.visible_record(self.curser_row).map(|r| r.id.clone())
    }

    /// Put the cursor back on `id` after the visible rows were derived again.
    fn follow_record(&mut self, id: Option<RecordId>) {
        if let Some(pos) = id.and_then(|id| self.table.position_of(&id)) {
            self.curser_row = pos;
        }
        self.update_table_data();
    }

    fn sort_current_column(&mut self) {
        let Some(field) = self.current_field() else {
            return;
        };
        let id = self.current_id();
        let start_time = Instant::now();
        self.table.set_sort(&field);
        let sort = self.table.sort_spec();
        info!(
            "Sorted by {:?} {:?} in {}ms",
            sort.key,
            sort.direction,
            start_time.elapsed().as_millis()
        );
        self.follow_record(id);
    }

    fn clear_filters(&mut self) {
        let id = self.current_id();
        self.table.clear_filters();
        self.set_status_message("Cleared all filters");
        self.follow_record(id);
    }

    fn toggle_current_selection(&mut self) {
        if let Some(id) = self.current_id() {
            self.table.toggle_row_selection(&id);
            self.update_table_data();
        }
    }

    fn toggle_select_all(&mut self) {
        self.table.toggle_select_all();
        self.update_table_data();
    }

    fn toggle_current_expansion(&mut self) {
        if let Some(id) = self.current_id() {
            self.table.toggle_row_expansion(&id);
            self.update_table_data();
        }
    }

    fn export(&mut self) {
        let export = self.table.export_rows();
        let path = self.config.export_path.clone();
        match export.write_csv(&path) {
            Ok(()) => self.set_status_message(format!(
                "Exported {} rows to {}",
                export.rows().len(),
                path.display()
            )),
            Err(e) => {
                error!("Export to {} failed: {e}", path.display());
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
        self.update_uidata();
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let Some(field) = self.current_field() else {
            return;
        };
        trace!("Entering command mode {mode:?} for {field} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.filter_backup = self.table.filter_text(&field).to_string();
        self.active_cmdinput = true;
        self.input.clear();
        self.input.set(&self.filter_backup);
        self.last_input = self.input.get();
        self.cmd_field = Some(field);
        self.update_uidata();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        } else if let Some(field) = &self.cmd_field {
            // Filter texts follow every keystroke, the table only on Enter
            self.table.set_filter(field, &self.last_input.input);
            self.update_uidata();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let field = self.cmd_field.take();
        match (self.cmd_mode.take(), field) {
            (Some(CMDMode::Filter), Some(field)) => {
                if self.last_input.canceled {
                    let backup = std::mem::take(&mut self.filter_backup);
                    self.table.set_filter(&field, &backup);
                    self.set_status_message("Filter input canceled");
                    self.update_uidata();
                } else {
                    self.table.set_filter(&field, &self.last_input.input);
                    let id = self.current_id();
                    self.table.apply_filters();
                    self.set_status_message(format!(
                        "{} of {} rows match",
                        self.table.visible_len(),
                        self.table.dataset().len()
                    ));
                    self.follow_record(id);
                }
            }
            (mode, field) => {
                warn!("Finished cmd input without target: {mode:?} {field:?}");
                self.update_uidata();
            }
        }
    }

    fn clipboard(&mut self) -> Option<&mut Clipboard> {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(c) => self.clipboard = Some(c),
                Err(e) => error!("Clipboard is not available: {e:?}"),
            }
        }
        self.clipboard.as_mut()
    }

    fn copy_to_clipboard(&mut self, content: String) {
        let copied = match self.clipboard() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => true,
                Err(e) => {
                    error!("Error copying to clipboard: {:?}", e);
                    false
                }
            },
            None => false,
        };
        if copied {
            self.set_status_message("Copied to clipboard");
        } else {
            self.set_status_message("Clipboard is not available");
        }
        self.update_uidata();
    }

    fn copy_cell(&mut self) {
        let Some(field) = self.current_field() else {
            return;
        };
        let schema = self.table.dataset().schema();
        let cell = match (self.table.visible_record(self.curser_row), schema.position(&field)) {
            (Some(record), Some(column)) => record.value(column).to_string(),
            _ => return,
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_row(&mut self) {
        let Some(record) = self.table.visible_record(self.curser_row) else {
            return;
        };
        let content = record
            .values
            .iter()
            .map(|v| wrap_cell_content(&v.to_string()))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content);
    }

    fn row_action(&mut self, action: RowAction) {
        let Some(record) = self.table.visible_record(self.curser_row) else {
            return;
        };
        let id = record.id.clone();
        // Rows are named by their first table column
        let name = self
            .shown_columns
            .first()
            .map(|&c| single_line(&record.value(c).to_string()))
            .unwrap_or_default();
        info!("Row action {action} on record {id}");
        self.set_status_message(format!("{action} {name}"));
        self.last_row_action = Some((action, id));
        self.update_uidata();
    }

    // -------------------- Cursor movement ---------------------- //

    fn move_selection_to(&mut self, row: usize) {
        self.curser_row = row;
        self.update_table_data();
    }

    fn move_selection_up(&mut self, size: usize) {
        self.curser_row = self.curser_row.saturating_sub(size);
        self.update_table_data();
    }

    fn move_selection_down(&mut self, size: usize) {
        let last = self.table.visible_len().saturating_sub(1);
        self.curser_row = std::cmp::min(self.curser_row + size, last);
        self.update_table_data();
    }

    fn move_selection_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        if self.offset_column + self.curser_column + 1 >= self.shown_columns.len() {
            return;
        }
        let next = self.curser_column + 1;
        if next < self.visible_columns.len()
            && self.visible_width_until(next) <= self.uilayout.table_width
        {
            self.curser_column = next;
        } else {
            // Scroll, the cursor keeps its screen position and lands on the next column
            self.offset_column += 1;
        }
        self.update_table_data();
    }

    fn visible_width_until(&self, curser_column: usize) -> usize {
        self.visible_columns[..=curser_column]
            .iter()
            .map(|&s| self.column_widths[s] + 1)
            .sum()
    }

    // -------------------- View building ---------------------- //

    fn detail_lines(&self, id: &RecordId, pos: usize) -> Vec<(String, String)> {
        if !self.table.is_expanded(id) {
            return Vec::new();
        }
        let schema = self.table.dataset().schema();
        let Some(record) = self.table.visible_record(pos) else {
            return Vec::new();
        };
        let mut columns = schema.detail();
        if columns.is_empty() {
            // Without dedicated detail fields, expanding shows the complete record
            columns = (0..schema.len()).collect();
        }
        columns
            .into_iter()
            .map(|c| {
                let value = single_line(&record.value(c).to_string());
                (schema.columns()[c].label.clone(), value)
            })
            .collect()
    }

    fn row_height(&self, pos: usize) -> usize {
        match self.table.visible_record(pos) {
            Some(record) => 1 + self.detail_lines(&record.id, pos).len(),
            None => 1,
        }
    }

    fn update_table_data(&mut self) {
        let nrows = self.table.visible_len();
        let height = self.uilayout.table_height.max(1);

        // Keep the cursor inside the rows and its lines on screen
        self.curser_row = std::cmp::min(self.curser_row, nrows.saturating_sub(1));
        if self.offset_row > self.curser_row {
            self.offset_row = self.curser_row;
        }
        let mut used: usize = (self.offset_row..=self.curser_row)
            .map(|pos| self.row_height(pos))
            .sum();
        while used > height && self.offset_row < self.curser_row {
            used -= self.row_height(self.offset_row);
            self.offset_row += 1;
        }

        // Columns that fit next to each other, the last one possibly partial
        self.offset_column = std::cmp::min(self.offset_column, self.shown_columns.len() - 1);
        self.visible_columns.clear();
        let mut visible_width = 0;
        for sidx in self.offset_column..self.shown_columns.len() {
            if visible_width >= self.uilayout.table_width && !self.visible_columns.is_empty() {
                break;
            }
            self.visible_columns.push(sidx);
            visible_width += self.column_widths[sidx] + 1;
        }
        self.curser_column =
            std::cmp::min(self.curser_column, self.visible_columns.len().saturating_sub(1));

        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, rows {}, th {}, tw {}",
            self.curser_row,
            self.curser_column,
            self.offset_row,
            self.offset_column,
            nrows,
            height,
            self.uilayout.table_width
        );
        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let schema = self.table.dataset().schema();
        let height = self.uilayout.table_height.max(1);

        let headers = self
            .visible_columns
            .iter()
            .map(|&sidx| {
                let column = &schema.columns()[self.shown_columns[sidx]];
                HeaderCell {
                    label: column.label.clone(),
                    width: self.column_widths[sidx],
                    indicator: self.table.sort_indicator(&column.field),
                    filter: self.table.filter_text(&column.field).to_string(),
                }
            })
            .collect();

        let mut rows = Vec::new();
        let mut used = 0;
        let mut pos = self.offset_row;
        while used < height {
            let Some(record) = self.table.visible_record(pos) else {
                break;
            };
            let cells = self
                .visible_columns
                .iter()
                .map(|&sidx| single_line(&record.value(self.shown_columns[sidx]).to_string()))
                .collect();
            let bands = self
                .visible_columns
                .iter()
                .map(|&sidx| {
                    let column = self.shown_columns[sidx];
                    schema.columns()[column]
                        .bands
                        .and_then(|b| b.classify(record.value(column)))
                })
                .collect();
            let row = RowView {
                id: record.id.clone(),
                cells,
                bands,
                selected: self.table.is_selected(&record.id),
                expanded: self.table.is_expanded(&record.id),
                detail: self.detail_lines(&record.id, pos),
            };
            used += row.height();
            rows.push(row);
            pos += 1;
        }

        let cmd_label = self
            .cmd_field
            .as_deref()
            .and_then(|f| schema.column(f))
            .map(|c| c.label.clone())
            .unwrap_or_default();

        self.uidata = UIData {
            name: self.table.dataset().name().to_string(),
            headers,
            rows,
            nrows: self.table.visible_len(),
            total_rows: self.table.dataset().len(),
            nselected: self.table.selected_len(),
            all_selected: self.table.all_selected(),
            filters_pending: self.table.has_pending_filters(),
            selected_row: self.curser_row - self.offset_row,
            selected_column: self.curser_column,
            abs_selected_row: self.curser_row,
            show_popup: self.uidata.show_popup,
            popup_message: std::mem::take(&mut self.uidata.popup_message),
            layout: self.uilayout.clone(),
            last_update: Instant::now(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            cmd_label,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        debug!("Status: {}", self.status_message);
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use ratatui::crossterm::event::KeyCode;

    fn model() -> Model {
        let config = TVConfig::default()
            .with_export_path(std::env::temp_dir().join("tabula-model-test.csv"));
        Model::init(&config, demo::employees().unwrap(), 120, 20).unwrap()
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_str(model: &mut Model, s: &str) {
        for c in s.chars() {
            send(model, Message::RawKey(KeyEvent::from(KeyCode::Char(c))));
        }
    }

    fn first_cells(model: &Model) -> Vec<String> {
        model
            .get_uidata()
            .rows
            .iter()
            .map(|r| r.cells[0].clone())
            .collect()
    }

    #[test]
    fn initial_view_shows_all_rows() {
        let m = model();
        let ui = m.get_uidata();
        assert_eq!(ui.nrows, 6);
        assert_eq!(ui.total_rows, 6);
        assert_eq!(ui.headers.len(), 3);
        assert_eq!(ui.headers[0].label, "Name");
        assert_eq!(ui.rows.len(), 6);
        assert_eq!(ui.selected_row, 0);
    }

    #[test]
    fn sort_keeps_cursor_on_record() {
        let mut m = model();
        send(&mut m, Message::MoveDown); // Amy Jones
        send(&mut m, Message::Sort);
        let ui = m.get_uidata();
        assert_eq!(ui.headers[0].indicator, SortIndicator::Up);
        assert_eq!(ui.rows[ui.selected_row].cells[0], "Amy Jones");
        assert_eq!(ui.abs_selected_row, 0);
    }

    #[test]
    fn filter_applies_on_enter() {
        let mut m = model();
        send(&mut m, Message::Filter);
        assert!(m.raw_keyevents());
        type_str(&mut m, "ad");
        assert_eq!(m.get_uidata().nrows, 6);
        assert!(m.get_uidata().filters_pending);

        send(&mut m, Message::RawKey(KeyEvent::from(KeyCode::Enter)));
        assert!(!m.raw_keyevents());
        assert_eq!(first_cells(&m), vec!["Eve Adams"]);
        assert_eq!(m.get_uidata().headers[0].filter, "ad");
    }

    #[test]
    fn escape_restores_previous_filter() {
        let mut m = model();
        send(&mut m, Message::Filter);
        type_str(&mut m, "bob");
        send(&mut m, Message::RawKey(KeyEvent::from(KeyCode::Enter)));
        assert_eq!(m.get_uidata().nrows, 1);

        send(&mut m, Message::Filter);
        type_str(&mut m, "xyz");
        send(&mut m, Message::RawKey(KeyEvent::from(KeyCode::Esc)));
        assert_eq!(m.table().filter_text("name"), "bob");
        assert!(!m.get_uidata().filters_pending);
        assert_eq!(m.get_uidata().nrows, 1);
    }

    #[test]
    fn selection_and_expansion() {
        let mut m = model();
        send(&mut m, Message::ToggleSelect);
        send(&mut m, Message::ToggleExpand);
        let ui = m.get_uidata();
        assert!(ui.rows[0].selected);
        assert!(ui.rows[0].expanded);
        assert_eq!(
            ui.rows[0].detail,
            vec![(
                "Signature Catch Phrase".to_string(),
                "Synergized static matrix".to_string()
            )]
        );
        assert_eq!(ui.nselected, 1);

        send(&mut m, Message::ToggleSelectAll);
        assert!(m.get_uidata().all_selected);
        send(&mut m, Message::ToggleSelectAll);
        assert_eq!(m.get_uidata().nselected, 0);
    }

    #[test]
    fn cursor_stays_visible_with_expanded_rows() {
        let config = TVConfig::default();
        let mut m = Model::init(&config, demo::employees().unwrap(), 120, 6).unwrap();
        // 6 lines minus title, header, filter and status line leave two table lines
        assert_eq!(m.get_uidata().layout.table_height, 2);
        send(&mut m, Message::ToggleExpand);
        send(&mut m, Message::MoveDown);
        let ui = m.get_uidata();
        assert_eq!(ui.abs_selected_row, 1);
        assert_eq!(ui.rows[ui.selected_row].cells[0], "Amy Jones");
    }

    #[test]
    fn movement_is_clamped() {
        let mut m = model();
        send(&mut m, Message::MoveUp);
        assert_eq!(m.get_uidata().abs_selected_row, 0);
        send(&mut m, Message::MoveEnd);
        assert_eq!(m.get_uidata().abs_selected_row, 5);
        send(&mut m, Message::MovePageDown);
        assert_eq!(m.get_uidata().abs_selected_row, 5);
        send(&mut m, Message::MoveBeginning);
        assert_eq!(m.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model();
        send(&mut m, Message::Help);
        assert!(m.get_uidata().show_popup);
        // Table messages are ignored while the popup is open
        send(&mut m, Message::MoveDown);
        assert_eq!(m.get_uidata().abs_selected_row, 0);
        send(&mut m, Message::Exit);
        assert!(!m.get_uidata().show_popup);
    }

    #[test]
    fn export_writes_visible_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let config = TVConfig::default().with_export_path(path.clone());
        let mut m = Model::init(&config, demo::employees().unwrap(), 120, 20).unwrap();
        send(&mut m, Message::Filter);
        type_str(&mut m, "amy");
        send(&mut m, Message::RawKey(KeyEvent::from(KeyCode::Enter)));
        send(&mut m, Message::Export);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Name,Email,Salary,Signature Catch Phrase");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Amy Jones,"));
        assert!(m.get_uidata().status_message.starts_with("Exported 1 rows"));
    }

    #[test]
    fn row_action_reports_current_record() {
        let mut m = model();
        send(&mut m, Message::MoveDown);
        send(&mut m, Message::RowAction(RowAction::Contact));
        assert_eq!(m.get_uidata().status_message, "Contact Amy Jones");
        assert_eq!(
            m.last_row_action(),
            Some(&(RowAction::Contact, RecordId::from(2)))
        );

        // Nothing to act on in an empty view
        send(&mut m, Message::Filter);
        type_str(&mut m, "zzz");
        send(&mut m, Message::RawKey(KeyEvent::from(KeyCode::Enter)));
        send(&mut m, Message::RowAction(RowAction::Deactivate));
        assert_eq!(m.last_row_action().map(|a| a.0), Some(RowAction::Contact));
    }

    #[test]
    fn salary_cells_carry_their_band() {
        let m = model();
        let rows = &m.get_uidata().rows;
        // Bob 40000, Amy 90000, Carl 62000
        assert_eq!(rows[0].bands, vec![None, None, Some(Band::Low)]);
        assert_eq!(rows[1].bands[2], Some(Band::High));
        assert_eq!(rows[2].bands[2], Some(Band::Mid));
    }

    #[test]
    fn line_breaks_render_on_one_line() {
        use crate::schema::{ColumnDef, Record, Schema, Value};
        let schema = Schema::new(vec![
            ColumnDef::text("name", "Name"),
            ColumnDef::text("note", "Note").detail(),
        ])
        .unwrap();
        let records = vec![Record::new(
            1,
            vec![Value::from("two\nlines"), Value::from("a\r\nb")],
        )];
        let dataset = Dataset::new("notes", schema, records).unwrap();
        let mut m = Model::init(&TVConfig::default(), dataset, 80, 10).unwrap();
        send(&mut m, Message::ToggleExpand);

        let row = &m.get_uidata().rows[0];
        assert_eq!(row.cells[0], "two ↵ lines");
        assert_eq!(row.detail, vec![("Note".to_string(), "a ↵ b".to_string())]);
        // The stored record and its export keep the original text
        assert_eq!(m.table().export_rows().rows()[0][0], Value::from("two\nlines"));
    }

    #[test]
    fn quit() {
        let mut m = model();
        send(&mut m, Message::Quit);
        assert_eq!(m.status, Status::QUITTING);
    }
}
