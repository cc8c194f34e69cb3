//! Prediction outcome view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::application::DiagnosticReport;
use crate::domain::Verdict;
use crate::tui::styles::MedicalTheme;

/// Result of the last Predict action
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    /// Nothing predicted yet
    #[default]
    Idle,
    /// Completed with a verdict
    Verdict(Verdict),
    /// Prediction failed; diagnostics are collected when first requested
    Error {
        message: String,
        diagnostics: Option<DiagnosticReport>,
    },
}

impl Outcome {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Render the outcome panel
pub fn render_outcome(f: &mut Frame, area: Rect, outcome: &Outcome, show_debug: bool) {
    match outcome {
        Outcome::Idle => render_idle(f, area),
        Outcome::Verdict(verdict) => render_verdict(f, area, verdict),
        Outcome::Error {
            message,
            diagnostics,
        } => {
            if show_debug {
                render_debug(f, area, message, diagnostics.as_ref());
            } else {
                render_error(f, area, message);
            }
        }
    }
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Ready to predict",
            MedicalTheme::text_secondary(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Adjust the measurements and press Enter",
            MedicalTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title(Span::styled(" Result ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_verdict(f: &mut Frame, area: Rect, verdict: &Verdict) {
    let risk_style = MedicalTheme::risk_level(verdict.risk);

    let block = Block::default()
        .title(Span::styled(" Result ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(risk_style);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Message
            Constraint::Length(3), // Probability
            Constraint::Min(0),
        ])
        .split(inner);

    let icon = if verdict.is_alert() { "!" } else { "OK" };
    let message = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{icon} {}", verdict.risk),
            risk_style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(verdict.message(), risk_style)),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(message, chunks[0]);

    match verdict.probability {
        Some(p) => {
            let gauge = Gauge::default()
                .block(
                    Block::default()
                        .title(Span::styled(" Probability ", MedicalTheme::text_secondary()))
                        .borders(Borders::ALL)
                        .border_style(MedicalTheme::border()),
                )
                .gauge_style(risk_style)
                .ratio(p.clamp(0.0, 1.0))
                .label(format!("{p:.2}"));
            f.render_widget(gauge, chunks[1]);
        }
        None => {
            let note = Paragraph::new(Line::from(Span::styled(
                "Model does not estimate probabilities",
                MedicalTheme::text_muted(),
            )))
            .alignment(Alignment::Center);
            f.render_widget(note, chunks[1]);
        }
    }
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Error", MedicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), MedicalTheme::text())),
        Line::from(""),
        Line::from(vec![
            Span::styled("[D] ", MedicalTheme::key_hint()),
            Span::styled("Show debug info", MedicalTheme::key_desc()),
        ]),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(Span::styled(" Result ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::danger()),
    );

    f.render_widget(content, area);
}

/// Lines of the developer report shown under a prediction error.
#[must_use]
pub fn debug_lines(message: &str, report: Option<&DiagnosticReport>) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("! {message}"),
            MedicalTheme::danger(),
        )),
        Line::from(""),
    ];

    let Some(report) = report else {
        lines.push(Line::from(Span::styled(
            "No diagnostics available",
            MedicalTheme::text_muted(),
        )));
        return lines;
    };

    lines.push(Line::from(Span::styled(
        "Model expects features:",
        MedicalTheme::text_secondary(),
    )));
    lines.push(Line::from(Span::styled(
        match &report.feature_names_in {
            Some(names) => names.join(", "),
            None => "(not recorded)".to_string(),
        },
        MedicalTheme::text(),
    )));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "Preprocessor:",
        MedicalTheme::text_secondary(),
    )));
    lines.push(Line::from(Span::styled(
        report
            .preprocessor
            .clone()
            .unwrap_or_else(|| "(none)".to_string()),
        MedicalTheme::text(),
    )));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "Preprocessor output features:",
        MedicalTheme::text_secondary(),
    )));
    lines.push(match &report.preprocessor_features_out {
        Ok(names) => Line::from(Span::styled(names.join(", "), MedicalTheme::text())),
        Err(reason) => Line::from(Span::styled(
            format!("unavailable: {reason}"),
            MedicalTheme::text_muted(),
        )),
    });

    lines
}

fn render_debug(f: &mut Frame, area: Rect, message: &str, report: Option<&DiagnosticReport>) {
    let content = Paragraph::new(debug_lines(message, report))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(" Debug Info ", MedicalTheme::warning()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::danger()),
        );

    f.render_widget(content, area);
}
