//! Patient measurement form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{RawPatientInput, Sex, YesNo};
use crate::tui::styles::MedicalTheme;

/// How a field is edited.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Bounded number changed by `step`; `decimals` controls display and rounding
    Stepper {
        min: f64,
        max: f64,
        step: f64,
        decimals: usize,
    },
    /// Fixed list of choices cycled with Left/Right
    Select { choices: Vec<&'static str> },
}

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub hint: &'static str,
    pub kind: FieldKind,
    /// Stepper value, or index into the choices of a selector
    pub value: f64,
    /// Digits typed but not yet committed
    pub input: Option<String>,
}

impl FormField {
    fn stepper(label: &'static str, hint: &'static str, min: f64, max: f64, value: f64) -> Self {
        Self {
            label,
            hint,
            kind: FieldKind::Stepper {
                min,
                max,
                step: 1.0,
                decimals: 0,
            },
            value,
            input: None,
        }
    }

    fn with_step(mut self, step: f64, decimals: usize) -> Self {
        if let FieldKind::Stepper { min, max, .. } = self.kind {
            self.kind = FieldKind::Stepper {
                min,
                max,
                step,
                decimals,
            };
        }
        self
    }

    fn select(
        label: &'static str,
        hint: &'static str,
        choices: Vec<&'static str>,
        default: usize,
    ) -> Self {
        Self {
            label,
            hint,
            kind: FieldKind::Select { choices },
            value: default as f64,
            input: None,
        }
    }

    /// Text shown in the field box.
    #[must_use]
    pub fn display_value(&self) -> String {
        if let Some(input) = &self.input {
            return input.clone();
        }
        match &self.kind {
            FieldKind::Stepper { decimals, .. } => format!("{:.*}", *decimals, self.value),
            FieldKind::Select { choices } => choices
                .get(self.value as usize)
                .copied()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Currently chosen label of a selector.
    fn choice(&self) -> Option<&'static str> {
        match &self.kind {
            FieldKind::Select { choices } => choices.get(self.value as usize).copied(),
            FieldKind::Stepper { .. } => None,
        }
    }

    /// Move by one step (stepper) or one choice (selector).
    fn adjust(&mut self, forward: bool) {
        match &self.kind {
            FieldKind::Stepper {
                min,
                max,
                step,
                decimals,
            } => {
                let delta = if forward { *step } else { -*step };
                self.value = round_to(self.value + delta, *decimals).clamp(*min, *max);
            }
            FieldKind::Select { choices } => {
                let len = choices.len();
                let idx = self.value as usize;
                let next = if forward {
                    (idx + 1) % len
                } else {
                    (idx + len - 1) % len
                };
                self.value = next as f64;
            }
        }
    }

    fn input_char(&mut self, c: char) -> bool {
        let FieldKind::Stepper { decimals, .. } = &self.kind else {
            return false;
        };
        let accepts = c.is_ascii_digit() || (c == '.' && *decimals > 0);
        if accepts {
            self.input.get_or_insert_with(String::new).push(c);
        }
        accepts
    }

    fn delete_char(&mut self) {
        if let Some(input) = self.input.as_mut() {
            input.pop();
        }
    }

    /// Apply typed digits, clamped to the field range.
    ///
    /// Unparseable input is discarded and the previous value kept.
    fn commit(&mut self) -> Result<(), String> {
        let Some(mut input) = self.input.take() else {
            return Ok(());
        };
        let result = match (&self.kind, input.parse::<f64>()) {
            (
                FieldKind::Stepper {
                    min, max, decimals, ..
                },
                Ok(parsed),
            ) if parsed.is_finite() => {
                self.value = round_to(parsed, *decimals).clamp(*min, *max);
                Ok(())
            }
            _ if input.is_empty() => Ok(()),
            _ => Err(format!("{}: Invalid number", self.label)),
        };
        input.zeroize();
        result
    }
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn sex_choices() -> Vec<&'static str> {
    Sex::CHOICES.iter().map(|s| s.label()).collect()
}

fn yes_no_choices() -> Vec<&'static str> {
    YesNo::CHOICES.iter().map(|a| a.label()).collect()
}

const CP_CHOICES: &[&str] = &["1", "2", "3", "4"];
const RESTECG_CHOICES: &[&str] = &["0", "1", "2"];
const SLOPE_CHOICES: &[&str] = &["1", "2", "3"];
const THAL_CHOICES: &[&str] = &["3", "6", "7"];

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        Self {
            fields: vec![
                FormField::stepper("Age", "years (1-120)", 1.0, 120.0, 50.0),
                FormField::select("Sex", "biological sex", sex_choices(), 0),
                FormField::select("Chest Pain", "type 1-4", CP_CHOICES.to_vec(), 0),
                FormField::stepper("Resting BP", "mmHg (50-250)", 50.0, 250.0, 120.0),
                FormField::stepper("Cholesterol", "mg/dL (100-600)", 100.0, 600.0, 200.0),
                FormField::select("Fasting BS", "> 120 mg/dL", yes_no_choices(), 0),
                FormField::select("Resting ECG", "result 0-2", RESTECG_CHOICES.to_vec(), 0),
                FormField::stepper("Max HR", "bpm (50-220)", 50.0, 220.0, 150.0),
                FormField::select("Exercise Angina", "induced angina", yes_no_choices(), 0),
                FormField::stepper("Oldpeak", "ST depression (0.0-10.0)", 0.0, 10.0, 1.0)
                    .with_step(0.1, 1),
                FormField::select("ST Slope", "slope 1-3", SLOPE_CHOICES.to_vec(), 0),
                FormField::stepper("Major Vessels", "count (0-4)", 0.0, 4.0, 0.0),
                FormField::select("Thalassemia", "3 / 6 / 7", THAL_CHOICES.to_vec(), 0),
            ],
            selected_field: 0,
            error_message: None,
        }
    }
}

impl PatientFormState {
    /// Move to the next field
    pub fn next_field(&mut self) {
        let _ = self.commit_selected();
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        let _ = self.commit_selected();
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Increase the selected stepper or cycle the selector forward
    pub fn increment(&mut self) {
        // Rejected text is dropped; the step still applies to the kept value
        let _ = self.commit_selected();
        self.fields[self.selected_field].adjust(true);
    }

    /// Decrease the selected stepper or cycle the selector backward
    pub fn decrement(&mut self) {
        // Rejected text is dropped; the step still applies to the kept value
        let _ = self.commit_selected();
        self.fields[self.selected_field].adjust(false);
    }

    /// Type a character into the selected stepper
    pub fn input_char(&mut self, c: char) {
        if self.fields[self.selected_field].input_char(c) {
            self.error_message = None;
        }
    }

    /// Delete the last typed character
    pub fn delete_char(&mut self) {
        self.fields[self.selected_field].delete_char();
    }

    /// Commit any typed digits on the selected field.
    ///
    /// Replaces any earlier error message; returns `false` if the typed
    /// text was rejected.
    pub fn commit_selected(&mut self) -> bool {
        match self.fields[self.selected_field].commit() {
            Ok(()) => {
                self.error_message = None;
                true
            }
            Err(e) => {
                self.error_message = Some(e);
                false
            }
        }
    }

    /// Restore every field to its default value.
    pub fn reset(&mut self) {
        self.clear_sensitive();
        *self = Self::default();
    }

    /// Wipe typed buffers from memory.
    pub fn clear_sensitive(&mut self) {
        for field in self.fields.iter_mut() {
            if let Some(input) = field.input.as_mut() {
                input.zeroize();
            }
            field.input = None;
        }
    }

    /// Convert the form answers to raw input for the encoder.
    ///
    /// # Errors
    /// Returns a message naming the field if a selector holds a label the
    /// encoder does not recognise.
    pub fn to_raw_input(&self) -> Result<RawPatientInput, String> {
        let number = |i: usize| self.fields[i].value.round() as i64;
        let code = |i: usize| -> Result<i64, String> {
            let field = &self.fields[i];
            field
                .choice()
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| format!("{}: Invalid choice", field.label))
        };
        let yes_no = |i: usize| -> Result<YesNo, String> {
            let field = &self.fields[i];
            field
                .choice()
                .and_then(YesNo::from_label)
                .ok_or_else(|| format!("{}: Invalid choice", field.label))
        };

        let sex = self.fields[1]
            .choice()
            .and_then(Sex::from_label)
            .ok_or_else(|| format!("{}: Invalid choice", self.fields[1].label))?;

        Ok(RawPatientInput {
            age: number(0),
            sex,
            cp: code(2)?,
            trestbps: number(3),
            chol: number(4),
            fbs: yes_no(5)?,
            restecg: code(6)?,
            thalach: number(7),
            exang: yes_no(8)?,
            oldpeak: round_to(self.fields[9].value, 1),
            slope: code(10)?,
            ca: number(11),
            thal: code(12)?,
        })
    }
}

/// Render the patient measurement form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let block = Block::default()
        .title(Span::styled(" Patient Measurements ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let field_height = 3;
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(field_height))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let border_style = if is_selected {
            MedicalTheme::border_focused()
        } else {
            MedicalTheme::border()
        };
        let title_style = if is_selected {
            MedicalTheme::focused()
        } else {
            MedicalTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let content = Paragraph::new(field_line(field, is_selected)).block(block);
        f.render_widget(content, chunks[i]);
    }
}

fn field_line(field: &FormField, is_selected: bool) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];

    match (&field.kind, &field.input) {
        (FieldKind::Select { choices }, _) => {
            for (idx, choice) in choices.iter().enumerate() {
                let style = if idx == field.value as usize {
                    MedicalTheme::selected()
                } else {
                    MedicalTheme::text_muted()
                };
                spans.push(Span::styled(format!(" {choice} "), style));
                spans.push(Span::raw(" "));
            }
        }
        (FieldKind::Stepper { .. }, Some(_)) => {
            spans.push(Span::styled(field.display_value(), MedicalTheme::warning()));
            spans.push(Span::styled("▌", MedicalTheme::focused()));
        }
        (FieldKind::Stepper { .. }, None) => {
            if is_selected {
                spans.push(Span::styled("◀ ", MedicalTheme::key_hint()));
            }
            spans.push(Span::styled(field.display_value(), MedicalTheme::text()));
            if is_selected {
                spans.push(Span::styled(" ▶", MedicalTheme::key_hint()));
            }
        }
    }

    spans.push(Span::styled(
        format!("  {}", field.hint),
        MedicalTheme::text_muted(),
    ));
    Line::from(spans)
}
