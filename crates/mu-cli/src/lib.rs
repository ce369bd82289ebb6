//! mu: Command-line front end
//!
//! Renders device runs for the terminal: colored progress lines while the
//! batch runs and a summary table at the end.

pub mod console;
pub mod output;
