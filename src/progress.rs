use std::fmt;

/// Point-in-time position of a pass through a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Events processed so far
    pub events: u64,
    /// Approximate byte offset reached in the document
    pub byte_offset: u64,
    /// Known or estimated document size
    pub total_bytes: Option<u64>,
}

impl Progress {
    pub fn new(events: u64, byte_offset: u64, total_bytes: Option<u64>) -> Self {
        Self {
            events,
            byte_offset,
            total_bytes,
        }
    }

    /// Share of the document read, truncated to one decimal place
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                let permille = (self.byte_offset as f64 / total as f64 * 1000.0).floor();
                Some(permille / 10.0)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.total_bytes, self.percent()) {
            (Some(total), Some(percent)) => write!(
                f,
                "{} events, byte {} of {} ({:.1}%)",
                self.events, self.byte_offset, total, percent
            ),
            _ => write!(f, "{} events, byte {}", self.events, self.byte_offset),
        }
    }
}
