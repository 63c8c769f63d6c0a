//! List rules command implementation.

use ktguard_core::{RulesConfig, Warning};
use ktguard_rules::{standard_rules, Preset, DEFAULT_CONFIG};
use std::fmt::Write;

/// One catalog row: the warning and the rule raising it.
struct Row {
    warning: &'static Warning,
    rule: &'static str,
    options: String,
}

fn rows() -> Vec<Row> {
    let defaults: toml::Table = toml::from_str(DEFAULT_CONFIG).unwrap_or_default();
    let config = RulesConfig::default();
    let mut rows = Vec::new();
    for factory in standard_rules() {
        let rule = factory(&config);
        for &warning in rule.warnings() {
            rows.push(Row {
                warning,
                rule: rule.name(),
                options: default_options(&defaults, warning.name),
            });
        }
    }
    rows
}

/// `key = value` pairs of the default configuration, without `enabled`.
fn default_options(defaults: &toml::Table, name: &str) -> String {
    defaults
        .get("rules")
        .and_then(|rules| rules.get(name))
        .and_then(toml::Value::as_table)
        .map(|table| {
            table
                .iter()
                .filter(|(key, _)| key.as_str() != "enabled")
                .map(|(key, value)| format!("{key} = {value}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn render_plain(rows: &[Row]) -> String {
    let mut out = String::from("Available rules:\n\n");
    let _ = writeln!(out, "{:<8} {:<34} {:<24} {:<4} Message", "Code", "Warning", "Rule", "Fix");
    out.push_str(&"-".repeat(100));
    out.push('\n');
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:<34} {:<24} {:<4} {}",
            row.warning.code,
            row.warning.name,
            row.rule,
            if row.warning.can_be_auto_corrected { "yes" } else { "no" },
            row.warning.text,
        );
        if !row.options.is_empty() {
            let _ = writeln!(out, "{:<8} options: {}", "", row.options);
        }
    }
    out.push_str("\nPresets:\n");
    for preset in Preset::ALL {
        let _ = writeln!(out, "  {:<12} {}", preset.name(), preset.summary());
    }
    out.push_str("\nConfigure warnings in ktguard.toml, e.g.:\n");
    out.push_str("  [rules.LONG_LINE]\n  lineLength = 100\n");
    out
}

fn render_markdown(rows: &[Row]) -> String {
    let mut out = String::from("| Code | Warning | Rule | Fix | Options | Message |\n");
    out.push_str("|------|---------|------|-----|---------|---------|\n");
    for row in rows {
        let _ = writeln!(
            out,
            "| {} | `{}` | `{}` | {} | {} | {} |",
            row.warning.code,
            row.warning.name,
            row.rule,
            if row.warning.can_be_auto_corrected { "yes" } else { "no" },
            if row.options.is_empty() {
                String::from("-")
            } else {
                format!("`{}`", row.options)
            },
            row.warning.text,
        );
    }
    out
}

/// Runs the list-rules command.
pub fn run(markdown: bool) {
    let rows = rows();
    if markdown {
        print!("{}", render_markdown(&rows));
    } else {
        print!("{}", render_plain(&rows));
    }
}
