//! Terminal styling for command output.
//!
//! Output is colored unless `--no-color` is passed or `NO_COLOR` is set.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod colors;
pub mod output;
pub mod table;

pub use output::*;
pub use table::*;

static PLAIN: AtomicBool = AtomicBool::new(false);

/// Picks colored or plain output for the rest of the process.
pub fn configure(no_color_flag: bool) {
    let env_opt_out = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    PLAIN.store(no_color_flag || env_opt_out, Ordering::Relaxed);
}

pub fn plain() -> bool {
    PLAIN.load(Ordering::Relaxed)
}
