//! Log sanitization for clinical values and secrets.
//!
//! Formatted log lines pass through `SanitizingMakeWriter`, which redacts:
//! - Clinical measurements written as `name=value` or `name: value`
//!   (`age=63`, `chol: 233`, ...)
//! - E-mail addresses and phone numbers
//! - Long hex strings (digests, key material)
//!
//! Callers should still avoid logging patient values; this is a fallback for
//! values that slip into `Debug` output or error messages.
//!
//! Input is capped at `HEARTCHECK_SANITIZE_MAX_BYTES` (default 16 KiB) per
//! call; anything beyond the cap is dropped and marked `[TRUNCATED]`.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FEATURE_NAMES;

static RULES: OnceLock<RedactionRules> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: String,
}

struct RedactionRules {
    any: RegexSet,
    rules: Vec<Rule>,
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEARTCHECK_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn clip(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn rules() -> &'static RedactionRules {
    RULES.get_or_init(|| {
        // Column names are plain identifiers, no escaping needed.
        let clinical = format!(
            r"(?i)\b({})\b(\s*[:=]\s*)-?\d+(?:\.\d+)?",
            FEATURE_NAMES.join("|")
        );

        let table: Vec<(String, &str)> = vec![
            (clinical, "${1}${2}[REDACTED]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b".to_string(),
                "[REDACTED-EMAIL]",
            ),
            (
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b".to_string(),
                "[REDACTED-PHONE]",
            ),
            (r"\b[0-9a-fA-F]{32,}\b".to_string(), "[REDACTED-KEY]"),
        ];

        let any = RegexSet::new(table.iter().map(|(p, _)| p.as_str()))
            .expect("redaction patterns are valid");
        let rules = table
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(&pattern).expect("redaction pattern is valid"),
                replacement: replacement.to_string(),
            })
            .collect();

        RedactionRules { any, rules }
    })
}

/// Redact clinical values and secrets from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let (prefix, truncated) = clip(input, max_bytes);

    let mut out = prefix.to_string();
    for idx in rules.any.matches(prefix).iter() {
        let rule = &rules.rules[idx];
        out = rule
            .regex
            .replace_all(&out, rule.replacement.as_str())
            .into_owned();
    }

    if truncated {
        out.push_str(" [TRUNCATED]");
    }
    out
}

/// A `tracing_subscriber` writer factory that sanitizes each formatted line
/// before handing it to the inner writer.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W: std::io::Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        // A line with no newline in sight is flushed whole instead of buffered forever.
        if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            let all = std::mem::take(&mut self.pending);
            self.write_sanitized(&all)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.drain_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.write_sanitized(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        // A trailing partial line is still sanitized on the way out.
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_redacts_clinical_pairs() {
        let out = sanitize("encoded age=63 chol: 233 oldpeak=2.3 label=1");
        assert_eq!(
            out,
            "encoded age=[REDACTED] chol: [REDACTED] oldpeak=[REDACTED] label=1"
        );
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        let line = "Loaded model from \"models/final_model.json\" (n_features_in=13)";
        assert_eq!(sanitize(line), line);
    }

    #[test]
    fn test_redacts_email_and_phone() {
        let out = sanitize("contact doctor@clinic.org or 555-123-4567");
        assert!(out.contains("[REDACTED-EMAIL]"));
        assert!(out.contains("[REDACTED-PHONE]"));
        assert!(!out.contains("clinic.org"));
    }

    #[test]
    fn test_redacts_hex_digests() {
        let out = sanitize("sha=0123456789abcdef0123456789abcdef0123");
        assert!(out.contains("[REDACTED-KEY]"));
    }

    #[test]
    fn test_truncates_large_input() {
        let out = sanitize_with_limit("é".repeat(100).as_str(), 11);
        assert!(out.ends_with(" [TRUNCATED]"));
        assert_eq!(out.trim_end_matches(" [TRUNCATED]").chars().count(), 5);
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut sink = Vec::new();
        {
            let mut w = SanitizingWriter {
                inner: &mut sink,
                pending: Vec::new(),
            };
            w.write_all(b"thal=7 ").unwrap();
            w.write_all(b"ok\nnext").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(String::from_utf8(sink).unwrap(), "thal=[REDACTED] ok\nnext");
    }

    #[test]
    fn test_writer_sanitizes_partial_line_on_drop() {
        let mut sink = Vec::new();
        {
            let mut w = SanitizingWriter {
                inner: &mut sink,
                pending: Vec::new(),
            };
            w.write_all(b"patient age=63").unwrap();
        }
        assert_eq!(String::from_utf8(sink).unwrap(), "patient age=[REDACTED]");
    }
}
