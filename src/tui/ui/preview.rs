//! Encoded record preview.

use ratatui::{
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::domain::FeatureFrame;
use crate::tui::styles::MedicalTheme;

fn format_value(column: &str, value: f64) -> String {
    if column == "oldpeak" {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}

/// Render the single-row frame that will be sent to the classifier,
/// one column per line.
pub fn render_preview(f: &mut Frame, area: Rect, frame: &FeatureFrame) {
    let header = Row::new(vec![
        Cell::from(Span::styled("Column", MedicalTheme::text_secondary())),
        Cell::from(Span::styled("Value", MedicalTheme::text_secondary())),
    ]);

    let rows: Vec<Row> = frame
        .iter()
        .map(|(column, value)| {
            Row::new(vec![
                Cell::from(Span::styled(column.to_string(), MedicalTheme::text_muted())),
                Cell::from(Span::styled(
                    format_value(column, value),
                    MedicalTheme::text(),
                )),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(6)])
        .header(header)
        .block(
            Block::default()
                .title(Span::styled(" Input Preview ", MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        );

    f.render_widget(table, area);
}
