//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use relief_lib::SeverityLabel;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a fraction as percentage
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Format large counts with thousands separators
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format damages as a compact currency amount
pub fn format_damages(amount: f64) -> String {
    if amount >= 1e9 {
        format!("{:.2}B", amount / 1e9)
    } else if amount >= 1e6 {
        format!("{:.2}M", amount / 1e6)
    } else if amount >= 1e3 {
        format!("{:.1}K", amount / 1e3)
    } else {
        format!("{:.0}", amount)
    }
}

/// Color severity label
pub fn color_severity(severity: SeverityLabel) -> String {
    match severity {
        SeverityLabel::High => severity.as_str().red().bold().to_string(),
        SeverityLabel::Medium => severity.as_str().yellow().to_string(),
        SeverityLabel::Low => severity.as_str().green().to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format!("{:.0}%", confidence * 100.0);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color fulfillment rate: full, partial, or nothing
pub fn color_fulfillment(rate: f64) -> String {
    let formatted = format_percent(rate);
    if rate >= 1.0 {
        formatted.green().to_string()
    } else if rate > 0.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_damages() {
        assert_eq!(format_damages(2_500_000.0), "2.50M");
        assert_eq!(format_damages(1_500.0), "1.5K");
        assert_eq!(format_damages(12.0), "12");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5), "50.0%");
        assert_eq!(format_percent(1.0), "100.0%");
    }
}
