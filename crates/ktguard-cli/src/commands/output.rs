//! Rendering of run results.
//!
//! Violations keep the order of the result: files by path, then emission
//! order within a file.

use anyhow::Result;
use ktguard_core::{FileFailure, LintResult, Severity, Violation};
use serde::Serialize;
use std::fmt::Write;

use crate::OutputFormat;

/// Print lint results in the specified format.
pub fn print(result: &LintResult, format: OutputFormat, group_by_file: bool) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(result, group_by_file)),
        OutputFormat::Json => println!("{}", render_json(result, group_by_file)?),
        OutputFormat::Compact => print!("{}", render_compact(result)),
    }
    Ok(())
}

fn severity_indicator(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "\x1b[31merror\x1b[0m",
        Severity::Warning => "\x1b[33mwarning\x1b[0m",
        Severity::Info => "\x1b[34minfo\x1b[0m",
    }
}

fn render_text(result: &LintResult, group_by_file: bool) -> String {
    let mut out = String::new();
    if group_by_file {
        for (file, violations) in result.group_by_file() {
            let _ = writeln!(out, "{}", file.display());
            for v in violations {
                let _ = writeln!(
                    out,
                    "  {}:{} {} {}{}",
                    v.location.line,
                    v.location.column,
                    severity_indicator(v.severity),
                    v.message,
                    status_suffix(v),
                );
            }
            out.push('\n');
        }
    } else {
        for v in &result.violations {
            let _ = writeln!(
                out,
                "{} {} at {}:{}:{}",
                v.code,
                v.rule,
                v.location.file.display(),
                v.location.line,
                v.location.column,
            );
            let _ = writeln!(out, "  {}: {}", severity_indicator(v.severity), v.message);
            if v.corrected {
                out.push_str("  = fixed\n");
            } else if v.can_be_auto_corrected {
                out.push_str("  = help: run `ktguard fix` to correct this automatically\n");
            }
            out.push('\n');
        }
    }

    for failure in &result.failures {
        let _ = writeln!(
            out,
            "\x1b[31m{}\x1b[0m {}: {}",
            failure.kind,
            failure.file.display(),
            failure.message
        );
    }

    let (errors, warnings, infos) = result.count_by_severity();
    let summary_color = if errors > 0 || !result.failures.is_empty() {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    let _ = write!(
        out,
        "{summary_color}Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s)",
        result.files_checked
    );
    let corrected = result.corrected_count();
    if corrected > 0 {
        let _ = write!(out, ", fixed {corrected} in {} file(s)", result.updated_files.len());
    }
    if result.baselined > 0 {
        let _ = write!(out, ", {} hidden by the baseline", result.baselined);
    }
    if !result.failures.is_empty() {
        let _ = write!(out, ", {} file(s) failed", result.failures.len());
    }
    out.push_str("\x1b[0m\n");
    out
}

fn status_suffix(v: &Violation) -> &'static str {
    if v.corrected {
        " (fixed)"
    } else if v.can_be_auto_corrected {
        " (can be auto-corrected)"
    } else {
        ""
    }
}

/// Violations of one file in the grouped JSON layout.
#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    violations: Vec<&'a Violation>,
}

#[derive(Serialize)]
struct GroupedReport<'a> {
    files: Vec<FileReport<'a>>,
    failures: &'a [FileFailure],
    files_checked: usize,
    baselined: usize,
}

fn render_json(result: &LintResult, group_by_file: bool) -> Result<String> {
    if !group_by_file {
        return Ok(serde_json::to_string_pretty(result)?);
    }
    let report = GroupedReport {
        files: result
            .group_by_file()
            .into_iter()
            .map(|(file, violations)| FileReport {
                file: file.display().to_string(),
                violations,
            })
            .collect(),
        failures: &result.failures,
        files_checked: result.files_checked,
        baselined: result.baselined,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_compact(result: &LintResult) -> String {
    result
        .violations
        .iter()
        .map(|v| {
            format!(
                "{}:{}:{}: {} [{}] {}{}\n",
                v.location.file.display(),
                v.location.line,
                v.location.column,
                v.severity,
                v.code,
                v.message,
                status_suffix(v),
            )
        })
        .collect()
}
