//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Data a
//! command was asked for (a field value, a hash) is always printed;
//! confirmations and tables of context are suppressed by `--quiet`.

use std::fmt::Display;

/// Placeholder shown for an empty table cell.
pub const EMPTY_CELL: &str = "--";

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print requested data (always shown).
pub fn data(message: impl Display) {
    println!("{}", message);
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Render rows as left-aligned columns.
///
/// Empty cells are shown as [`EMPTY_CELL`]. The last column is not
/// padded, so lines carry no trailing whitespace.
pub fn format_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let cell = |s: &str| -> String {
        if s.is_empty() {
            EMPTY_CELL.to_string()
        } else {
            s.to_string()
        }
    };

    let lines: Vec<Vec<String>> = std::iter::once(header.iter().map(|h| h.to_string()).collect())
        .chain(rows.iter().map(|row| row.iter().map(|c| cell(c)).collect()))
        .collect();

    let columns = header.len();
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            lines
                .iter()
                .filter_map(|line| line.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    lines
        .iter()
        .map(|line| {
            let mut out = String::new();
            for (i, value) in line.iter().enumerate() {
                if i + 1 == line.len() {
                    out.push_str(value);
                } else {
                    out.push_str(&format!("{:<width$}  ", value, width = widths[i]));
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}
