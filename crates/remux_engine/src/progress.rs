//! Progress extraction from the transcoder's diagnostic stream.
//!
//! ffmpeg prints the input duration once (`Duration: 00:01:02.50, ...`) and
//! then rewrites a status line terminated by `\r` (`... time=00:00:31.25 ...`).
//! Progress is the ratio of the two.

/// Incremental parser for ffmpeg stderr output.
#[derive(Debug, Default)]
pub struct StderrMonitor {
    pending: Vec<u8>,
    duration_secs: Option<f64>,
    last_diagnostic: Option<String>,
}

impl StderrMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a chunk of raw output and returns the progress fractions
    /// completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<f64> {
        let mut fractions = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                let line = std::mem::take(&mut self.pending);
                fractions.extend(self.line(&String::from_utf8_lossy(&line)));
            } else {
                self.pending.push(byte);
            }
        }
        fractions
    }

    /// Flushes a trailing line without terminator.
    pub fn finish(&mut self) -> Vec<f64> {
        let line = std::mem::take(&mut self.pending);
        self.line(&String::from_utf8_lossy(&line))
            .into_iter()
            .collect()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Last line that was not a status update; usually the reason for a failure.
    pub fn last_diagnostic(&self) -> Option<&str> {
        self.last_diagnostic.as_deref()
    }

    fn line(&mut self, raw: &str) -> Option<f64> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(time) = field_value(line, "time=") {
            let elapsed = parse_timestamp(time)?;
            let total = self.duration_secs.filter(|total| *total > 0.0)?;
            return Some((elapsed / total).clamp(0.0, 1.0));
        }

        if self.duration_secs.is_none() {
            if let Some(value) = field_value(line, "Duration:") {
                self.duration_secs = parse_timestamp(value.trim_end_matches(','));
            }
        }
        self.last_diagnostic = Some(line.to_string());
        None
    }
}

fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    line[start..].split_whitespace().next()
}

/// Parses `HH:MM:SS.frac` into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
