//! TUI module: Terminal User Interface using Ratatui.
//!
//! A single screen with:
//! - Patient measurement form
//! - Preview of the encoded record
//! - Prediction verdict and optional diagnostics

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::MedicalTheme;
