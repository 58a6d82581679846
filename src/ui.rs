// Terminal UI utilities
// Everything goes to stderr; stdout is reserved for artifacts.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn print_header(title: &str) {
    eprintln!();
    eprintln!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    eprintln!("{}", format!("║  {:<58}║", title).bright_blue());
    eprintln!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    eprintln!();
}

pub fn print_success(message: &str) {
    eprintln!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    eprintln!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    eprintln!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// Spinner drawn on stderr while the engine works
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
