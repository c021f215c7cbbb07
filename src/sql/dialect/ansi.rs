//! ANSI SQL reference dialect.
//!
//! Uses every default of [`SqlDialect`]. Useful as a baseline in tests and
//! documentation; real databases are covered by the `Dialect` enum.

use super::SqlDialect;

/// ANSI SQL reference dialect.
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }
}
