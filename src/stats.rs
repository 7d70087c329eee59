//! Per-operation statistics: payload sizes and elapsed time

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationStats {
    pub input_size: usize,
    pub output_size: usize,
    pub elapsed: Duration,
}

impl OperationStats {
    /// Run `f`, timing it. `f` returns its result and the size of its output.
    pub fn measure<T, E>(
        input_size: usize,
        f: impl FnOnce() -> Result<(T, usize), E>,
    ) -> Result<(T, Self), E> {
        let start = Instant::now();
        let (value, output_size) = f()?;
        let stats = Self {
            input_size,
            output_size,
            elapsed: start.elapsed(),
        };
        Ok((value, stats))
    }
}

impl fmt::Display for OperationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in, {} out, {:.4}s",
            format_bytes(self.input_size as u64),
            format_bytes(self.output_size as u64),
            self.elapsed.as_secs_f64()
        )
    }
}

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size using 1024-based units and at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        return format!("{} B", bytes);
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
