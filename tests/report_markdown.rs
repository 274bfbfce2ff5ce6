use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn macready_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_macready"));
    cmd.env("HOME", home);
    cmd.current_dir(home);
    cmd.env_remove("MACREADY_CONFIG");
    cmd.env_remove("MACREADY_UI_COLOR");
    cmd.env_remove("MACREADY_UI_MAX_TABLE_ROWS");
    cmd.env_remove("MACREADY_SCAN_EXCLUDE");
    cmd.env_remove("MACREADY_REPORT_WRITE_FILE");
    cmd.env_remove("MACREADY_REPORT_DIR");
    cmd.env_remove("SUDO_UID");
    cmd.env_remove("SUDO_GID");
    cmd.env_remove("SUDO_USER");
    cmd
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home =
        std::env::temp_dir().join(format!("macready-report-md-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, body).expect("write script");
    let mut perms = std::fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("chmod");
}

fn healthy_apple_silicon_path(home: &Path) -> String {
    let bin_dir = home.join("bin");
    std::fs::create_dir_all(&bin_dir).expect("mkdir bin");
    write_script(
        bin_dir.join("sysctl").as_path(),
        r#"#!/bin/sh
if [ "$2" = "hw.optional.arm64" ]; then
  echo 1
  exit 0
fi
if [ "$2" = "machdep.cpu.brand_string" ]; then
  echo "Apple M2"
  exit 0
fi
exit 1
"#,
    );
    write_script(
        bin_dir.join("uname").as_path(),
        "#!/bin/sh\necho arm64\nexit 0\n",
    );
    write_script(
        bin_dir.join("sw_vers").as_path(),
        "#!/bin/sh\necho 14.3\nexit 0\n",
    );
    write_script(
        bin_dir.join("xcodebuild").as_path(),
        "#!/bin/sh\necho \"Xcode 15.1\"\nexit 0\n",
    );
    write_script(bin_dir.join("ps").as_path(), "#!/bin/sh\nexit 0\n");
    format!(
        "{}:{}",
        bin_dir.display(),
        std::env::var("PATH").unwrap_or_default()
    )
}

fn run_with_path(home: &Path, path: &str, args: &[&str]) -> Output {
    let mut cmd = macready_cmd(home);
    cmd.env("PATH", path);
    cmd.args(args);
    cmd.output().expect("run macready")
}

#[test]
fn report_markdown_has_fixed_section_order() {
    let home = make_temp_home();
    let path = healthy_apple_silicon_path(&home);

    let out = run_with_path(&home, &path, &["report"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    let blocks = [
        "# macready レポート",
        "## ホスト情報",
        "## 確認結果",
        "### システム（アーキテクチャ/OS）",
        "### パッケージマネージャ",
        "### PATH",
        "### 実行中プロセス",
        "### コンテナランタイム",
        "### 開発ツールチェーン",
        "## 所見",
        "## 概要",
        "## 推奨事項",
    ];
    let mut last = 0;
    for block in blocks {
        let pos = stdout.find(block).unwrap_or_else(|| {
            panic!("missing block {block}: stdout={stdout}");
        });
        assert!(pos >= last, "block out of order: {block}\nstdout={stdout}");
        last = pos;
    }

    assert!(stdout.contains("```sh"), "stdout={stdout}");
    assert!(stdout.contains("- チップ: Apple M2"), "stdout={stdout}");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn high_priority_block_appears_only_with_criticals() {
    let home = make_temp_home();
    let path = healthy_apple_silicon_path(&home);

    let out = run_with_path(&home, &path, &["report"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(!stdout.contains("### 最優先対応"), "stdout={stdout}");

    // OS を Apple Silicon 未対応バージョンへ差し替える
    write_script(
        home.join("bin/sw_vers").as_path(),
        "#!/bin/sh\necho 10.15.7\nexit 0\n",
    );
    let out = run_with_path(&home, &path, &["report"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("### 最優先対応"), "stdout={stdout}");
    assert!(stdout.contains("[CRITICAL]"), "stdout={stdout}");
    assert!(stdout.contains("10.15.7"), "stdout={stdout}");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn report_subcommand_writes_no_file() {
    let home = make_temp_home();
    let path = healthy_apple_silicon_path(&home);

    let out = run_with_path(&home, &path, &["report"]);
    assert!(out.status.success());

    let reports = std::fs::read_dir(&home)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("macready-report-")
        })
        .count();
    assert_eq!(reports, 0);

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn test_mode_substitutes_placeholder_facts() {
    let home = make_temp_home();
    let path = healthy_apple_silicon_path(&home);

    let out = run_with_path(&home, &path, &["--test", "report"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("テストモード: パッケージ列挙をスキップしました"),
        "stdout={stdout}"
    );
    assert!(
        stdout.contains("テストモード: プロセス列挙をスキップしました"),
        "stdout={stdout}"
    );
    assert!(
        stdout.contains("テストモード: コンテナ列挙をスキップしました"),
        "stdout={stdout}"
    );
    assert!(
        stdout.contains("テストモード: ツールチェーン検査をスキップしました"),
        "stdout={stdout}"
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn rosetta_process_findings_appear_in_report() {
    let home = make_temp_home();
    let path = healthy_apple_silicon_path(&home);
    let bin_dir = home.join("bin");

    // x86_64 の開発ツール1つ + 認識外プロセス1つ
    write_script(
        bin_dir.join("ps").as_path(),
        r#"#!/bin/sh
echo "  312 /usr/local/bin/node"
echo "  500 /Applications/Legacy.app/Contents/MacOS/legacy"
exit 0
"#,
    );
    write_script(
        bin_dir.join("file").as_path(),
        r#"#!/bin/sh
case "$2" in
  /usr/local/bin/node) echo "Mach-O 64-bit executable x86_64" ;;
  /Applications/Legacy.app/Contents/MacOS/legacy) echo "Mach-O 64-bit executable x86_64" ;;
  *) echo "data" ;;
esac
exit 0
"#,
    );
    let out = run_with_path(&home, &path, &["--json", "report"]);
    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse report json");
    let findings = report["findings"].as_array().expect("findings");

    let itemized: Vec<_> = findings
        .iter()
        .filter(|f| {
            f["message"]
                .as_str()
                .is_some_and(|m| m.contains("開発ツール") && m.contains("node"))
        })
        .collect();
    assert_eq!(itemized.len(), 1, "report={report}");
    assert!(
        itemized[0]["message"]
            .as_str()
            .is_some_and(|m| m.contains("312")),
        "report={report}"
    );

    assert!(
        findings.iter().any(|f| {
            f["message"]
                .as_str()
                .is_some_and(|m| m.contains("動作中のプロセス: 2件"))
        }),
        "report={report}"
    );
    assert!(
        !findings
            .iter()
            .any(|f| f["message"].as_str().is_some_and(|m| m.contains("legacy"))),
        "report={report}"
    );

    let _ = std::fs::remove_dir_all(&home);
}
