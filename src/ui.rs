use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
};

use crate::model::{HeaderCell, Model, RowView, UIData};
use crate::schema::Band;
use crate::table::SortIndicator;

pub const CMDLINE_HEIGH: usize = 1;
pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 2; // Labels and filters
pub const ROW_PREFIX_WIDTH: usize = 6; // "▶ [x] "
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SORT_INDICATOR_WIDTH: usize = 2;

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Fill(1),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Paragraph::new(title_line(uidata)), title_area);

        let mut lines = vec![header_line(uidata), filter_line(uidata)];
        lines.extend(row_lines(uidata, table_area.width as usize));
        frame.render_widget(Paragraph::new(lines), table_area);

        self.draw_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = format!("Filter {}: ", uidata.cmd_label);
            let cursor_x = area.x as usize + prompt.chars().count() + uidata.cmdinput.cursor_pos;
            let line = Line::from(vec![prompt.bold(), uidata.cmdinput.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position(Position::new(cursor_x as u16, area.y));
        } else {
            let line = Line::from(vec![
                Span::raw(uidata.status_message.clone()),
                Span::raw("  "),
                "? help".dim(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }
}

/// Pad or cut `s` to exactly `width` characters.
pub fn fit(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len <= width {
        format!("{s}{}", " ".repeat(width - len))
    } else if width == 0 {
        String::new()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

fn title_line(uidata: &UIData) -> Line<'static> {
    let mut spans = vec![
        format!(" {} ", uidata.name).bold().reversed(),
        Span::raw(format!(
            " {}/{} rows, {} selected",
            uidata.nrows, uidata.total_rows, uidata.nselected
        )),
    ];
    if uidata.filters_pending {
        spans.push(" | filters changed, Enter applies".yellow());
    }
    Line::from(spans)
}

fn header_line(uidata: &UIData) -> Line<'static> {
    let mut spans = vec![Span::raw(format!("  {} ", checkbox(uidata.all_selected)))];
    for (cidx, header) in uidata.headers.iter().enumerate() {
        spans.push(header_span(header, cidx == uidata.selected_column));
    }
    Line::from(spans)
}

fn header_span(header: &HeaderCell, current: bool) -> Span<'static> {
    let text = match header.indicator {
        SortIndicator::None => header.label.clone(),
        indicator => format!("{} {}", header.label, indicator.symbol()),
    };
    let mut style = Style::new().add_modifier(Modifier::BOLD);
    match header.indicator {
        SortIndicator::Up => style = style.fg(Color::Blue),
        SortIndicator::Down => style = style.fg(Color::Red),
        SortIndicator::None => {}
    }
    if current {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(format!("{} ", fit(&text, header.width)), style)
}

fn filter_line(uidata: &UIData) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(ROW_PREFIX_WIDTH))];
    for header in uidata.headers.iter() {
        let text = if header.filter.is_empty() {
            fit("·", header.width).dim()
        } else {
            fit(&header.filter, header.width).italic().yellow()
        };
        spans.push(text);
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn row_lines(uidata: &UIData, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (ridx, row) in uidata.rows.iter().enumerate() {
        let current = ridx == uidata.selected_row;
        lines.push(row_line(row, uidata, current));
        for (label, value) in row.detail.iter() {
            let text = format!("{}{label}: {value}", " ".repeat(ROW_PREFIX_WIDTH));
            lines.push(Line::from(fit(&text, width).italic().dim()));
        }
    }
    lines
}

fn row_line(row: &RowView, uidata: &UIData, current: bool) -> Line<'static> {
    let expander = if row.expanded { "▼" } else { "▶" };
    let mut spans = vec![Span::raw(format!(
        "{expander} {} ",
        checkbox(row.selected)
    ))];
    let cells = row.cells.iter().zip(row.bands.iter());
    for (cidx, ((cell, &band), header)) in cells.zip(uidata.headers.iter()).enumerate() {
        let mut style = band.map(band_style).unwrap_or_default();
        if current && cidx == uidata.selected_column {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        }
        spans.push(Span::styled(fit(cell, header.width), style));
        spans.push(Span::raw(" "));
    }
    let mut line = Line::from(spans);
    if current {
        line = line.reversed();
    } else if row.selected {
        line = line.green();
    }
    line
}

fn band_style(band: Band) -> Style {
    let bg = match band {
        Band::Low => Color::Blue,
        Band::Mid => Color::Yellow,
        Band::High => Color::Red,
    };
    Style::new().fg(Color::White).bg(bg)
}

fn draw_popup(message: &str, frame: &mut Frame) {
    let area = frame.area();
    let width = message
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as u16
        + 4;
    let height = message.lines().count() as u16 + 2;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    };
    let block = Block::bordered().title(" Help ".bold());
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(message.to_string()).block(block), popup);
}
