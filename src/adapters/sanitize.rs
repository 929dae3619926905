//! Log sanitization for clinical values.
//!
//! The screening pipeline never logs raw patient inputs on purpose, but error
//! messages from artifacts or parsers can echo them. Every formatted log line
//! passes through [`SanitizingMakeWriter`], which redacts:
//! - clinical `field=value` / `field: value` pairs (age, cholesterol, ...)
//! - long numeric vectors (encoded or scaled feature rows)
//! - UUIDs
//!
//! Input is capped at `HEARTSCREEN_SANITIZE_MAX_BYTES` (16 KiB default) per line.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const RULES: &[(&str, &str)] = &[
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-UUID]",
    ),
    (
        r"(?i)\b(age|sex|chest_?pain(?:_?type)?|resting_?bp|restingbp|cholesterol|fasting_?bs(?:_?high)?|fastingbs|resting_?ecg|max_?hr|maxhr|exercise_?angina|oldpeak|st_?slope)(\s*[:=]\s*)[A-Za-z0-9_.+-]+",
        "${1}${2}[REDACTED]",
    ),
    (
        r"\[\s*-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?(?:\s*,\s*-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?){4,}\s*\]",
        "[REDACTED-VECTOR]",
    ),
];

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    set: Option<RegexSet>,
    rules: Vec<Rule>,
    /// False when any rule failed to compile. Lines are then withheld whole.
    complete: bool,
}

const WITHHELD_LINE: &str = "[REDACTED-LOG-LINE]";

fn compile(specs: &[(&str, &'static str)]) -> Patterns {
    let rules: Vec<Rule> = specs
        .iter()
        .filter_map(|&(pattern, replacement)| {
            Regex::new(pattern).ok().map(|regex| Rule {
                regex,
                replacement,
            })
        })
        .collect();
    let set = RegexSet::new(rules.iter().map(|r| r.regex.as_str())).ok();
    let complete = rules.len() == specs.len() && set.is_some();
    Patterns {
        set,
        rules,
        complete,
    }
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| compile(RULES))
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEARTSCREEN_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Redact clinical values from a string.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    sanitize_with(patterns(), input, max_bytes)
}

fn sanitize_with(patterns: &Patterns, input: &str, max_bytes: usize) -> String {
    if !patterns.complete {
        let mut line = WITHHELD_LINE.to_string();
        if input.ends_with('\n') {
            line.push('\n');
        }
        return line;
    }
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let matched: Vec<usize> = match &patterns.set {
        Some(set) => set.matches(prefix).into_iter().collect(),
        None => (0..patterns.rules.len()).collect(),
    };

    let mut result = prefix.to_string();
    for idx in matched {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether a string would be altered by [`sanitize`].
#[must_use]
pub fn contains_clinical_data(input: &str) -> bool {
    let patterns = patterns();
    if !patterns.complete {
        return true;
    }
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns.rules.iter().any(|r| r.regex.is_match(prefix))
}

/// `MakeWriter` wrapper that sanitizes each formatted log line.
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
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A single line with no newline must not grow without bound.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_redacts_clinical_pairs() {
        let out = sanitize("rejected input age=63 cholesterol: 233 oldpeak=2.3 st_slope=flat");
        assert!(!out.contains("63"));
        assert!(!out.contains("233"));
        assert!(!out.contains("2.3"));
        assert!(!out.contains("flat"));
        assert!(out.contains("age=[REDACTED]"));
        assert!(out.contains("cholesterol: [REDACTED]"));
    }

    #[test]
    fn test_redacts_feature_vectors() {
        let out = sanitize("row [0.95, 1.0, 0.0, 1.0, 0.0, -0.25, 1.1] failed");
        assert_eq!(out, "row [REDACTED-VECTOR] failed");
    }

    #[test]
    fn test_short_lists_survive() {
        let out = sanitize("classes [0, 1]");
        assert_eq!(out, "classes [0, 1]");
    }

    #[test]
    fn test_redacts_uuid() {
        let out = sanitize("session 550e8400-e29b-41d4-a716-446655440000 done");
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(!out.contains("550e8400"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let line = "Loaded 50 reference rows from models/encoded_data_train.csv";
        assert_eq!(sanitize(line), line);
        assert!(!contains_clinical_data(line));
        assert!(contains_clinical_data("max_hr=150"));
    }

    #[test]
    fn test_truncates_large_inputs() {
        let out = sanitize_with_limit("ééééééééé", 5);
        assert!(out.ends_with(" [TRUNCATED]"));
    }

    #[test]
    fn test_every_rule_compiles() {
        let patterns = patterns();
        assert_eq!(patterns.rules.len(), RULES.len());
        assert!(patterns.set.is_some());
        assert!(patterns.complete);
    }

    #[test]
    fn test_broken_rule_withholds_whole_line() {
        let broken = compile(&[RULES[0], (r"(unclosed", "[X]"), RULES[2]]);
        assert!(!broken.complete);

        let out = sanitize_with(&broken, "rejected input age=63 cholesterol=233\n", 1024);
        assert_eq!(out, "[REDACTED-LOG-LINE]\n");
        assert!(!out.contains("63"));
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let sink = Sink::default();
        let mut writer = SanitizingWriter::new(sink.clone());
        writer.write_all(b"first age=").unwrap();
        writer.write_all(b"54 line\nsecond line\n").unwrap();
        writer.flush().unwrap();

        let written = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "first age=[REDACTED] line\nsecond line\n");
    }
}
