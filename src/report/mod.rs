use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::core::{Report, Stage};

const FILE_STAMP: &[BorrowedFormatItem<'_>] =
    format_description!("[year][month][day]-[hour][minute][second]");

/// レポートをMarkdownへ描画する。タイムスタンプ（generated_at）以外は
/// 同一入力に対して決定的。
pub fn render_markdown(report: &Report) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();

    let _ = writeln!(out, "# macready レポート");
    let _ = writeln!(out);
    let _ = writeln!(out, "- ツールバージョン: {}", report.tool_version);
    let _ = writeln!(out, "- 生成日時: {}", report.generated_at);
    let _ = writeln!(
        out,
        "- 判定: 重大 {} / 警告 {} / 情報 {}",
        report.summary.critical, report.summary.warning, report.summary.info
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "## ホスト情報");
    let _ = writeln!(out);
    let _ = writeln!(out, "- チップ: {}", report.host.chip_model);
    let _ = writeln!(out, "- 現在のアーキテクチャ: {}", report.host.current_arch);
    let _ = writeln!(out, "- macOS: {}", report.host.os_version);
    let _ = writeln!(
        out,
        "- Apple Silicon対応ハードウェア: {}",
        if report.host.apple_silicon {
            "はい"
        } else {
            "いいえ"
        }
    );
    let _ = writeln!(
        out,
        "- Rosetta 2: {}",
        match report.host.rosetta_installed {
            Some(true) => "インストール済み",
            Some(false) => "未インストール",
            None => "不明",
        }
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "## 確認結果");
    for section in &report.sections {
        let _ = writeln!(out);
        let _ = writeln!(out, "### {}", section.stage.title());
        let _ = writeln!(out);
        if section.facts.is_empty() {
            let _ = writeln!(out, "_確認結果はありません。_");
        }
        for fact in &section.facts {
            let _ = writeln!(out, "- {fact}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## 所見 ({})", report.findings.len());
    if report.findings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "_所見はありません。_");
    }
    for stage in Stage::ALL {
        let findings: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.stage == stage)
            .collect();
        if findings.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "### {}", stage.title());
        let _ = writeln!(out);
        for finding in findings {
            let _ = writeln!(out, "- [{}] {}", finding.severity, finding.message);
            if let Some(remedy) = &finding.remedy {
                let _ = writeln!(out, "  - 対処: {remedy}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## 概要");
    let _ = writeln!(out);
    let _ = writeln!(out, "- 重大（CRITICAL）: {}件", report.summary.critical);
    let _ = writeln!(out, "- 警告（WARNING）: {}件", report.summary.warning);
    let _ = writeln!(out, "- 情報（INFO）: {}件", report.summary.info);

    let _ = writeln!(out);
    let _ = writeln!(out, "## 推奨事項");
    let _ = writeln!(out);
    if report.has_critical() {
        let _ = writeln!(out, "### 最優先対応");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "重大な互換性問題が検出されました。移行作業の前に解消してください。"
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "- macOS / Xcode を Apple Silicon 対応バージョンへ更新する");
        let _ = writeln!(
            out,
            "- ネイティブ（arm64）モードのシェルで環境を構築し直す"
        );
        let _ = writeln!(out);
    }
    let _ = writeln!(
        out,
        "- Homebrew は /opt/homebrew の arm64 ネイティブ版へ移行し、PATH の順序を確認してください。"
    );
    let _ = writeln!(
        out,
        "- よく使う開発ツールから順に arm64 ネイティブ版へ置き換えてください。"
    );
    let _ = writeln!(
        out,
        "- Docker イメージは multi-platform（arm64 対応）ビルドの利用を検討してください。"
    );
    let _ = writeln!(
        out,
        "- Rosetta 2 は移行期間中の保険として残しておいて問題ありません。"
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "確認用コマンドの例:");
    let _ = writeln!(out);
    let _ = writeln!(out, "```sh");
    let _ = writeln!(out, "arch");
    let _ = writeln!(out, "file \"$(which brew)\"");
    let _ = writeln!(out, "softwareupdate --install-rosetta --agree-to-license");
    let _ = writeln!(out, "```");

    out
}

/// スキャン開始時刻で名前を付けたレポートファイルを1回の実行につき
/// 1つ書き出す。
pub fn write_report_file(
    dir: &Path,
    started_at: OffsetDateTime,
    markdown: &str,
) -> Result<PathBuf> {
    let stamp = started_at
        .format(FILE_STAMP)
        .unwrap_or_else(|_| format!("{}", started_at.unix_timestamp()));
    let path = dir.join(format!("macready-report-{stamp}.md"));
    std::fs::write(&path, markdown)
        .with_context(|| format!("レポートの書き込みに失敗しました: {}", path.display()))?;
    Ok(path)
}
