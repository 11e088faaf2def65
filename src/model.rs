use std::fmt;

/// Which byte count a local file reports.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum SizeMetric {
    /// Bytes the file occupies on disk (block count based where available).
    Allocated,
    /// Logical file length.
    #[default]
    Apparent,
}

impl SizeMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::Apparent => "apparent",
        }
    }
}

/// Aggregate of one `DirSizer::size` call.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Totals {
    pub total_size: u64,
    pub file_count: u64,
}

impl Totals {
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.file_count == 1 { "file" } else { "files" };
        write!(
            f,
            "{} in {} {noun}",
            format_bytes(self.total_size),
            self.file_count
        )
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
