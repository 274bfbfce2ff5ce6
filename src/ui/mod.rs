use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{Report, Severity};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "エラー:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "原因:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "次に:");
    let _ = writeln!(
        stderr,
        "  - 詳細を見るには `--verbose` を付けて再実行してください"
    );
    let _ = writeln!(
        stderr,
        "  - 利用可能なコマンド/オプションは `macready --help` を参照してください"
    );
}

pub fn print_scan(report: &Report, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "判定: 重大={} 警告={} 情報={}",
        report.summary.critical, report.summary.warning, report.summary.info
    );
    let _ = writeln!(
        out,
        "ホスト: {} / {} / macOS {}",
        report.host.chip_model, report.host.current_arch, report.host.os_version
    );

    if report.findings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "互換性の問題は見つかりませんでした。");
        return;
    }

    let total = report.findings.len();
    let rows = cfg.max_table_rows.min(total);

    let _ = writeln!(out);
    if total > rows {
        let _ = writeln!(out, "所見（{rows}件表示 / 全{total}件）:");
    } else {
        let _ = writeln!(out, "所見（{rows}件表示）:");
    }
    print_findings_table(&mut out, report, rows, cfg.color);

    if cfg.verbose {
        let _ = writeln!(out);
        let _ = writeln!(out, "対処:");
        for finding in &report.findings {
            if let Some(remedy) = &finding.remedy {
                let _ = writeln!(out, "- {}: {remedy}", finding.message);
            }
        }
    }
}

fn print_findings_table(out: &mut dyn Write, report: &Report, rows: usize, color: bool) {
    let label_severity = "重大度";
    let label_stage = "ステージ";
    let label_message = "内容";

    let severity_w = report
        .findings
        .iter()
        .take(rows)
        .map(|f| visible_width_ansi(f.severity.as_str()))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_severity));
    let stage_w = report
        .findings
        .iter()
        .take(rows)
        .map(|f| visible_width_ansi(f.stage.as_str()))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_stage));

    let _ = writeln!(
        out,
        "{}  {}  {}",
        pad_end_display(label_severity, severity_w),
        pad_end_display(label_stage, stage_w),
        label_message
    );
    let _ = writeln!(
        out,
        "{}  {}  {}",
        "-".repeat(severity_w),
        "-".repeat(stage_w),
        "-".repeat(visible_width_ansi(label_message).max(4))
    );

    for finding in report.findings.iter().take(rows) {
        let severity = pad_end_ansi(&format_severity(finding.severity, color), severity_w);
        let stage = pad_end_display(finding.stage.as_str(), stage_w);
        let _ = writeln!(
            out,
            "{severity}  {stage}  {}",
            truncate_middle(&finding.message, 96)
        );
    }
}

fn format_severity(severity: Severity, color: bool) -> String {
    let s = severity.as_str();
    if !color {
        return s.to_string();
    }

    let code = match severity {
        Severity::Critical => "31",
        Severity::Warning => "33",
        Severity::Info => "36",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s
        .chars()
        .rev()
        .take(right)
        .collect::<String>()
        .chars()
        .rev()
        .collect();

    format!("{prefix}...{suffix}")
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                let _ = chars.next();
                while let Some(ch2) = chars.next() {
                    if ch2 == 'm' {
                        break;
                    }
                }
                continue;
            }
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_middle_keeps_short_strings() {
        assert_eq!(truncate_middle("short", 10), "short");
    }

    #[test]
    fn truncate_middle_shortens_long_strings() {
        let s = "a".repeat(200);
        let t = truncate_middle(&s, 20);
        assert!(t.chars().count() <= 20);
        assert!(t.contains("..."));
    }

    #[test]
    fn visible_width_ignores_ansi_sequences() {
        let colored = "\x1b[31mCRITICAL\x1b[0m";
        assert_eq!(visible_width_ansi(colored), "CRITICAL".len());
    }
}
