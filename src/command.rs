//! Serial console commands
use core::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Command {
    /// Report all stored records.
    #[strum(serialize = "DUMP")]
    Dump,
    /// Report record count and storage cursors.
    #[strum(serialize = "STATUS")]
    Status,
}

impl Command {
    /// Parse one console line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        Self::from_str(line.trim()).ok()
    }
}
