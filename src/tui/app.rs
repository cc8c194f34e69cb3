//! Main TUI application state machine.
//!
//! Handles:
//! - Form navigation and editing
//! - Input event handling
//! - Synchronous prediction through the session

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use crate::adapters::PipelineModel;
use crate::application::Session;
use crate::ports::Classifier;

use super::styles::MedicalTheme;
use super::ui::{
    form::{render_patient_form, PatientFormState},
    preview::render_preview,
    render_disclaimer, render_halted, render_header,
    verdict::{render_outcome, Outcome},
};

/// Main application state
pub struct App<C: Classifier = PipelineModel> {
    /// Loaded model, or the reason it failed to load
    session: Session<C>,

    /// Whether the app should quit
    should_quit: bool,

    /// Patient form state
    form: PatientFormState,

    /// Result of the last prediction
    outcome: Outcome,

    /// Whether the debug report replaces the error message
    show_debug: bool,
}

impl<C: Classifier> App<C> {
    /// Create the application around a started session.
    pub fn new(session: Session<C>) -> Self {
        Self {
            session,
            should_quit: false,
            form: PatientFormState::default(),
            outcome: Outcome::default(),
            show_debug: false,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        self.form.clear_sensitive();
        result
    }

    fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Draw the whole screen.
    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(2), // Footer
                Constraint::Length(3), // Disclaimer
            ])
            .split(f.area());

        render_header(f, chunks[0]);

        if let Some(reason) = self.session.halt_reason() {
            render_halted(f, chunks[1], reason);
        } else {
            self.draw_form_screen(f, chunks[1]);
            self.draw_footer(f, chunks[2]);
        }

        render_disclaimer(f, chunks[3]);
    }

    fn draw_form_screen(&self, f: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(area);

        render_patient_form(f, columns[0], &self.form);

        // Preview reflects committed values only
        let preview = self
            .form
            .to_raw_input()
            .ok()
            .map(|raw| self.session.preview(&raw));
        // Header row plus borders
        let preview_height = preview.as_ref().map_or(0, |frame| frame.len() as u16 + 3);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(preview_height), Constraint::Min(0)])
            .split(columns[1]);

        if let Some(frame) = &preview {
            render_preview(f, right[0], frame);
        }
        render_outcome(f, right[1], &self.outcome, self.show_debug);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let content = if let Some(err) = &self.form.error_message {
            Line::from(vec![
                Span::styled("! ", MedicalTheme::danger()),
                Span::styled(err.clone(), MedicalTheme::danger()),
            ])
        } else {
            let mut spans = vec![
                Span::styled("[↑↓] ", MedicalTheme::key_hint()),
                Span::styled("Field ", MedicalTheme::key_desc()),
                Span::styled("[←→/-+] ", MedicalTheme::key_hint()),
                Span::styled("Adjust ", MedicalTheme::key_desc()),
                Span::styled("[0-9] ", MedicalTheme::key_hint()),
                Span::styled("Type ", MedicalTheme::key_desc()),
                Span::styled("[Enter] ", MedicalTheme::key_hint()),
                Span::styled("Predict ", MedicalTheme::key_desc()),
                Span::styled("[R] ", MedicalTheme::key_hint()),
                Span::styled("Reset ", MedicalTheme::key_desc()),
            ];
            if self.outcome.is_error() {
                spans.push(Span::styled("[D] ", MedicalTheme::key_hint()));
                spans.push(Span::styled("Debug ", MedicalTheme::key_desc()));
            }
            spans.push(Span::styled("[Q] ", MedicalTheme::key_hint()));
            spans.push(Span::styled("Quit", MedicalTheme::key_desc()));
            Line::from(spans)
        };

        let footer = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(MedicalTheme::border()),
        );

        f.render_widget(footer, area);
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.session.is_halted() {
            if matches!(
                key,
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
            ) {
                self.should_quit = true;
            }
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up | KeyCode::BackTab => self.form.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form.next_field(),
            KeyCode::Left | KeyCode::Char('-') => self.form.decrement(),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => self.form.increment(),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.form.reset();
            }
            KeyCode::Char('d') | KeyCode::Char('D') => self.toggle_debug(),
            KeyCode::Char(c) => self.form.input_char(c),
            KeyCode::Backspace => self.form.delete_char(),
            KeyCode::Enter => self.predict(),
            _ => {}
        }
    }

    /// Show or hide the diagnostic report; only meaningful after an error.
    fn toggle_debug(&mut self) {
        let Outcome::Error { diagnostics, .. } = &mut self.outcome else {
            return;
        };
        if diagnostics.is_none() {
            *diagnostics = self.session.diagnostics();
        }
        self.show_debug = !self.show_debug;
    }

    fn predict(&mut self) {
        if !self.form.commit_selected() {
            return;
        }

        let raw = match self.form.to_raw_input() {
            Ok(raw) => raw,
            Err(e) => {
                self.form.error_message = Some(e);
                return;
            }
        };

        self.show_debug = false;
        self.outcome = match self.session.predict(&raw) {
            Ok(verdict) => Outcome::Verdict(verdict),
            Err(e) => {
                tracing::warn!("Prediction failed: {e}");
                Outcome::Error {
                    message: e.to_string(),
                    diagnostics: None,
                }
            }
        };
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}
