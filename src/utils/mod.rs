//! Utilities module for logging, error types and small helpers

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{DiagnosisError, InvalidImageError, Result, SpeechError, TranslationError};
pub use logging::{init_logging, LogConfig, LogLevel, StageTimer};

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Format a probability as a percentage
pub fn format_percent(p: f32) -> String {
    format!("{:.2}%", p * 100.0)
}
