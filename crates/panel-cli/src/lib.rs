//! Library components of the `panel` command-line tool.

pub mod logging;
pub mod output;
