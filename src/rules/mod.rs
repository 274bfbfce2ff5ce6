use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::classify;
use crate::core::{FindingLog, HostProfile, Severity, Stage};
use crate::probe::{ContainerRuntime, SystemProbe};

pub mod tables;

#[derive(Clone)]
pub struct RuleContext {
    pub profile: HostProfile,
    pub verbose: bool,
    pub test_mode: bool,
    pub exclude: GlobSet,
}

impl RuleContext {
    fn excluded(&self, path: &Path) -> bool {
        self.exclude.is_match(path)
    }
}

pub fn build_exclude_set(excludes: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in excludes {
        builder.add(Glob::new(pat).with_context(|| format!("exclude glob が不正です: {pat}"))?);
    }
    Ok(builder.build()?)
}

pub fn build_host_profile(probe: &dyn SystemProbe) -> HostProfile {
    HostProfile {
        apple_silicon: probe.apple_silicon().unwrap_or(false),
        current_arch: probe
            .current_arch()
            .unwrap_or_else(|| "unknown".to_string()),
        chip_model: probe.chip_model().unwrap_or_else(|| "unknown".to_string()),
        os_version: probe.os_version().unwrap_or_else(|| "unknown".to_string()),
        rosetta_installed: probe.rosetta_installed(),
    }
}

/// 固定順のパイプライン。各ステージは所見をログへ追記し、
/// レポート用の確認結果（facts）を返す。
pub fn run_stage(
    stage: Stage,
    ctx: &RuleContext,
    probe: &dyn SystemProbe,
    log: &mut FindingLog,
) -> Vec<String> {
    match stage {
        Stage::System => system_stage(ctx, log),
        Stage::Packages => packages_stage(ctx, probe, log),
        Stage::PathOrder => path_stage(ctx, probe, log),
        Stage::Processes => processes_stage(ctx, probe, log),
        Stage::Containers => containers_stage(ctx, probe, log),
        Stage::Toolchains => toolchains_stage(ctx, probe, log),
    }
}

fn system_stage(ctx: &RuleContext, log: &mut FindingLog) -> Vec<String> {
    let profile = &ctx.profile;
    let mut facts = vec![
        format!("チップ: {}", profile.chip_model),
        format!("現在のアーキテクチャ: {}", profile.current_arch),
        format!("macOS: {}", profile.os_version),
        format!(
            "Apple Silicon対応ハードウェア: {}",
            if profile.apple_silicon { "はい" } else { "いいえ" }
        ),
        format!(
            "Rosetta 2: {}",
            match profile.rosetta_installed {
                Some(true) => "インストール済み",
                Some(false) => "未インストール",
                None => "不明",
            }
        ),
    ];

    match parse_major(&profile.os_version) {
        Some(major) => {
            if profile.apple_silicon && major < tables::MIN_MACOS_MAJOR_FOR_ARM {
                log.record(
                    Stage::System,
                    Severity::Critical,
                    format!(
                        "macOS {} は Apple Silicon 未対応です（macOS {} 以降が必要）",
                        profile.os_version,
                        tables::MIN_MACOS_MAJOR_FOR_ARM
                    ),
                    Some(format!(
                        "macOS {}（Big Sur）以降へアップグレードしてください",
                        tables::MIN_MACOS_MAJOR_FOR_ARM
                    )),
                );
            }
        }
        None => {
            facts.push(format!(
                "OSバージョンを解釈できませんでした: {}",
                profile.os_version
            ));
        }
    }

    if profile.apple_silicon && profile.current_arch == "x86_64" {
        log.record(
            Stage::System,
            Severity::Critical,
            "Apple Silicon対応ハードウェアですが、現在 x86_64 モードで動作しています",
            Some(
                "Rosetta を介さないネイティブのシェルから再実行してください（`arch` で現在のモードを確認できます）"
                    .to_string(),
            ),
        );
    }

    if profile.apple_silicon && profile.rosetta_installed == Some(false) {
        log.record(
            Stage::System,
            Severity::Warning,
            "Rosetta 2 がインストールされていません（x86_64 バイナリを実行できません）",
            Some(
                "`softwareupdate --install-rosetta --agree-to-license` でインストールできます"
                    .to_string(),
            ),
        );
    }

    facts
}

fn packages_stage(ctx: &RuleContext, probe: &dyn SystemProbe, log: &mut FindingLog) -> Vec<String> {
    if ctx.test_mode {
        return vec!["テストモード: パッケージ列挙をスキップしました".to_string()];
    }

    let arm_brew = PathBuf::from(tables::ARM_PREFIX).join("bin/brew");
    let intel_brew = PathBuf::from(tables::INTEL_PREFIX).join("bin/brew");
    let arm_present = probe.file_exists(&arm_brew);
    let intel_present = probe.file_exists(&intel_brew);

    let mut facts = vec![
        format!(
            "Homebrew（{}）: {}",
            tables::ARM_PREFIX,
            if arm_present { "検出" } else { "未検出" }
        ),
        format!(
            "Homebrew（{}）: {}",
            tables::INTEL_PREFIX,
            if intel_present { "検出" } else { "未検出" }
        ),
    ];

    // プレフィックス対規則: どちら向きの不一致も報告する
    if ctx.profile.apple_silicon && intel_present {
        log.record(
            Stage::Packages,
            Severity::Warning,
            format!(
                "Homebrew が x86_64 用プレフィックス（{}）にインストールされています",
                tables::INTEL_PREFIX
            ),
            Some(format!(
                "arm64 ネイティブの Homebrew（{}）への移行を検討してください",
                tables::ARM_PREFIX
            )),
        );
    }
    if !ctx.profile.apple_silicon && arm_present {
        log.record(
            Stage::Packages,
            Severity::Warning,
            format!(
                "Intel ホストに arm64 用プレフィックス（{}）の Homebrew が存在します",
                tables::ARM_PREFIX
            ),
            Some("意図した構成でなければ取り除いてください".to_string()),
        );
    }

    let mut seen: HashSet<String> = HashSet::new();
    for (brew, prefix) in [
        (&arm_brew, tables::ARM_PREFIX),
        (&intel_brew, tables::INTEL_PREFIX),
    ] {
        if !probe.file_exists(brew) {
            continue;
        }
        match probe.installed_packages(brew) {
            Some(packages) => {
                facts.push(format!(
                    "インストール済みパッケージ（{prefix}）: {}件",
                    packages.len()
                ));
                for name in packages {
                    if !seen.insert(name.clone()) {
                        continue;
                    }
                    evaluate_package(ctx, probe, log, &name);
                }
            }
            None => {
                facts.push(format!("インストール済みパッケージ（{prefix}）: 未観測"));
            }
        }
    }

    facts
}

fn evaluate_package(
    ctx: &RuleContext,
    probe: &dyn SystemProbe,
    log: &mut FindingLog,
    name: &str,
) {
    if !ctx.profile.apple_silicon {
        return;
    }

    if tables::is_native_ext_package(name) {
        log.record(
            Stage::Packages,
            Severity::Info,
            format!(
                "パッケージ {name} はネイティブ拡張を含む可能性があり、arm64 移行後に再ビルドが必要かもしれません"
            ),
            Some(format!("`brew reinstall {name}` を検討してください")),
        );
    }

    let Some(path) = probe.resolve_executable(name) else {
        return;
    };
    if ctx.excluded(&path) {
        return;
    }
    let classification = classify::classify_path(probe, &path);
    if classification.arch.is_foreign_only() {
        log.record(
            Stage::Packages,
            Severity::Warning,
            format!(
                "パッケージ {name} のバイナリが x86_64 専用です（{}）",
                path.display()
            ),
            Some(format!(
                "`brew reinstall {name}` で arm64 版へ入れ替えてください"
            )),
        );
    }
}

fn path_stage(ctx: &RuleContext, probe: &dyn SystemProbe, log: &mut FindingLog) -> Vec<String> {
    let entries = probe.path_entries();
    let arm_bin = PathBuf::from(tables::ARM_PREFIX).join("bin");
    let intel_bin = PathBuf::from(tables::INTEL_PREFIX).join("bin");

    let arm_pos = entries.iter().position(|p| p == &arm_bin);
    let intel_pos = entries.iter().position(|p| p == &intel_bin);

    let mut facts = vec![format!("PATH エントリ: {}件", entries.len())];
    facts.push(match arm_pos {
        Some(i) => format!("{}: {}番目", arm_bin.display(), i + 1),
        None => format!("{}: PATH に含まれていません", arm_bin.display()),
    });
    facts.push(match intel_pos {
        Some(i) => format!("{}: {}番目", intel_bin.display(), i + 1),
        None => format!("{}: PATH に含まれていません", intel_bin.display()),
    });

    if !ctx.profile.apple_silicon {
        return facts;
    }

    if arm_pos.is_none() && probe.dir_exists(&arm_bin) {
        log.record(
            Stage::PathOrder,
            Severity::Warning,
            format!(
                "PATH に {} が含まれていません（実在するのに参照されていません）",
                arm_bin.display()
            ),
            Some(
                "シェル設定に `eval \"$(/opt/homebrew/bin/brew shellenv)\"` を追加してください"
                    .to_string(),
            ),
        );
    }

    if let (Some(arm), Some(intel)) = (arm_pos, intel_pos) {
        if intel < arm {
            log.record(
                Stage::PathOrder,
                Severity::Warning,
                format!(
                    "{} が {} より前に並んでいます（先勝ちのため x86_64 版が優先されます）",
                    intel_bin.display(),
                    arm_bin.display()
                ),
                Some(format!(
                    "PATH の順序を見直し、{} を先にしてください",
                    arm_bin.display()
                )),
            );
        }
    }

    facts
}

fn processes_stage(ctx: &RuleContext, probe: &dyn SystemProbe, log: &mut FindingLog) -> Vec<String> {
    if ctx.test_mode {
        return vec!["テストモード: プロセス列挙をスキップしました".to_string()];
    }

    let Some(processes) = probe.processes() else {
        return vec!["プロセス一覧: 未観測".to_string()];
    };

    let mut facts = vec![format!("確認したプロセス: {}件", processes.len())];

    if !ctx.profile.apple_silicon {
        return facts;
    }

    let mut foreign_total: usize = 0;
    for process in &processes {
        if process.runtime_arch != "x86_64" {
            continue;
        }
        if ctx.excluded(&process.command_path) {
            continue;
        }
        foreign_total += 1;

        let Some(basename) = process
            .command_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
        else {
            continue;
        };
        if !tables::is_dev_tool(&basename) {
            continue;
        }

        let remedy = match native_alternative(probe, &process.command_path) {
            Some(alt) => format!(
                "arm64 版が {} にあります。PATH の順序を確認してください",
                alt.display()
            ),
            None => format!(
                "arm64 版の再インストールを検討してください（例: `brew reinstall {basename}`）"
            ),
        };
        log.record(
            Stage::Processes,
            Severity::Warning,
            format!(
                "x86_64（Rosetta）で動作中の開発ツール: {basename}（PID {}）",
                process.pid
            ),
            Some(remedy),
        );
    }

    facts.push(format!("x86_64 プロセス: {foreign_total}件"));
    if foreign_total > 0 {
        log.record(
            Stage::Processes,
            Severity::Warning,
            format!("x86_64（Rosetta）で動作中のプロセス: {foreign_total}件"),
            None,
        );
    }

    facts
}

/// /usr/local 配下の実行ファイルに対応する /opt/homebrew 側のパスを探す。
fn native_alternative(probe: &dyn SystemProbe, path: &Path) -> Option<PathBuf> {
    let rest = path.strip_prefix(tables::INTEL_PREFIX).ok()?;
    let candidate = PathBuf::from(tables::ARM_PREFIX).join(rest);
    if probe.file_exists(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

fn containers_stage(ctx: &RuleContext, probe: &dyn SystemProbe, log: &mut FindingLog) -> Vec<String> {
    if ctx.test_mode {
        return vec!["テストモード: コンテナ列挙をスキップしました".to_string()];
    }

    let mut facts = Vec::new();
    match probe.container_runtime() {
        ContainerRuntime::NotInstalled => {
            facts.push("Docker: 未検出".to_string());
        }
        ContainerRuntime::Idle => {
            facts.push("Docker: 検出（デーモン停止中）".to_string());
            log.record(
                Stage::Containers,
                Severity::Info,
                "Docker はインストールされていますが、デーモンが起動していません",
                Some(
                    "コンテナの互換性を確認するには Docker を起動して再実行してください"
                        .to_string(),
                ),
            );
        }
        ContainerRuntime::Running(containers) => {
            facts.push(format!("実行中コンテナ: {}件", containers.len()));
            if ctx.profile.apple_silicon {
                for container in &containers {
                    match probe.container_arch(&container.id) {
                        Some(arch) if arch == "amd64" || arch == "x86_64" => {
                            log.record(
                                Stage::Containers,
                                Severity::Info,
                                format!(
                                    "コンテナ {}（{}）は x86_64 エミュレーションで動作しています",
                                    container.image, container.id
                                ),
                                Some(
                                    "arm64 対応イメージ（multi-platform ビルド）への移行を検討してください"
                                        .to_string(),
                                ),
                            );
                        }
                        Some(_) => {}
                        None => {
                            if ctx.verbose {
                                facts.push(format!(
                                    "コンテナ {}: アーキテクチャ未観測",
                                    container.id
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    if ctx.profile.apple_silicon {
        if let Some(config) = probe.container_runtime_config() {
            match serde_json::from_str::<serde_json::Value>(&config) {
                Ok(value) => {
                    let default_platform = value
                        .get("defaultPlatform")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    if default_platform.contains("amd64") || default_platform.contains("x86_64") {
                        log.record(
                            Stage::Containers,
                            Severity::Warning,
                            format!(
                                "Docker のデフォルトプラットフォームが x86_64 に固定されています（defaultPlatform: {default_platform}）"
                            ),
                            Some(
                                "~/.docker/config.json から defaultPlatform の上書きを外してください"
                                    .to_string(),
                            ),
                        );
                    }
                }
                Err(_) => {
                    if ctx.verbose {
                        facts.push("Docker 設定（config.json）を解釈できませんでした".to_string());
                    }
                }
            }
        }
    }

    facts
}

fn toolchains_stage(ctx: &RuleContext, probe: &dyn SystemProbe, log: &mut FindingLog) -> Vec<String> {
    if ctx.test_mode {
        return vec!["テストモード: ツールチェーン検査をスキップしました".to_string()];
    }

    let mut facts = Vec::new();
    for toolchain in tables::TOOLCHAINS {
        let name = toolchain.name;
        let Some(path) = probe.resolve_executable(name) else {
            facts.push(format!("{name}: 未検出"));
            continue;
        };
        if ctx.excluded(&path) {
            facts.push(format!("{name}: 除外（{}）", path.display()));
            continue;
        }

        let classification = classify::classify_path(probe, &path);
        let version = probe.tool_version(name, &path);
        facts.push(format!(
            "{name}: {} / {} / {}",
            version.as_deref().unwrap_or("バージョン不明"),
            classification.arch.label(),
            path.display()
        ));
        if ctx.verbose {
            match classification.unknown_reason {
                Some(classify::UnknownReason::Missing) => {
                    facts.push(format!("{name}: バイナリが見つかりませんでした"));
                }
                Some(classify::UnknownReason::Unrecognized) => {
                    facts.push(format!("{name}: バイナリ形式を判別できませんでした"));
                }
                None => {}
            }
        }

        if let Some(min) = toolchain.min_native_major {
            match version.as_deref().and_then(parse_major) {
                Some(major) if major < min => {
                    // バイナリ自体の分類に関わらず、古いツールチェーンは致命的
                    log.record(
                        Stage::Toolchains,
                        Severity::Critical,
                        format!(
                            "{name} {} は Apple Silicon 未対応です（バージョン {min} 以降が必要）",
                            version.as_deref().unwrap_or("不明")
                        ),
                        Some(format!(
                            "{name} をバージョン {min} 以降へアップデートしてください"
                        )),
                    );
                }
                Some(_) => {}
                None => {
                    facts.push(format!(
                        "{name}: バージョン未観測のため対応判定をスキップしました"
                    ));
                }
            }
        }

        if ctx.profile.apple_silicon && classification.arch.is_foreign_only() {
            log.record(
                Stage::Toolchains,
                Severity::Warning,
                format!("{name} が x86_64 バイナリです（{}）", path.display()),
                Some(format!(
                    "arm64 ネイティブ版へ入れ替えてください（例: `brew reinstall {name}`）"
                )),
            );
        }
    }

    facts
}

fn parse_major(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.parse::<u32>().ok()
}
