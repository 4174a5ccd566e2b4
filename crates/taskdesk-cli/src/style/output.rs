//! Line-oriented output: decisions, fields and notices.

use super::colors::SemanticStyle;

/// Allowed decision, on stdout.
pub fn print_allowed(subject: &str) {
    println!("{} allowed: {subject}", "✓".success());
}

/// Denied decision with its first unmet permission, on stderr.
pub fn print_denied(subject: &str, missing: &str) {
    eprintln!("{} denied: {subject} (missing {missing})", "✗".error());
}

pub fn print_ok(msg: &str) {
    println!("{} {msg}", "✓".success());
}

pub fn print_notice(msg: &str) {
    println!("{} {msg}", "!".warning());
}

pub fn print_title(title: &str) {
    println!("{}", title.header());
}

/// Indented `key: value` line.
pub fn print_field(key: &str, value: &str) {
    println!("  {}: {value}", key.muted());
}
