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
        std::env::temp_dir().join(format!("macready-critical-test-{}-{seq}", std::process::id()));
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

/// Apple Silicon 対応ハードウェアが x86_64 モードで動作している状況を作る。
fn apple_silicon_in_x86_mode_path(home: &Path) -> String {
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
  echo "Apple M1"
  exit 0
fi
exit 1
"#,
    );
    write_script(
        bin_dir.join("uname").as_path(),
        "#!/bin/sh\necho x86_64\nexit 0\n",
    );
    write_script(
        bin_dir.join("sw_vers").as_path(),
        "#!/bin/sh\necho 12.2.1\nexit 0\n",
    );
    write_script(
        bin_dir.join("xcodebuild").as_path(),
        "#!/bin/sh\necho \"Xcode 14.2\"\nexit 0\n",
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
fn native_hardware_in_x86_mode_yields_critical_and_exit_1() {
    let home = make_temp_home();
    let path = apple_silicon_in_x86_mode_path(&home);

    let out = run_with_path(&home, &path, &["scan", "--quiet", "--no-report-file"]);
    assert_eq!(
        out.status.code(),
        Some(1),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn json_report_carries_the_critical_finding_and_counts() {
    let home = make_temp_home();
    let path = apple_silicon_in_x86_mode_path(&home);

    let out = run_with_path(
        &home,
        &path,
        &["--json", "scan", "--no-report-file"],
    );
    assert_eq!(out.status.code(), Some(1));

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse report json");
    let critical = report["summary"]["critical"].as_u64().expect("critical");
    assert!(critical >= 1, "report={report}");

    let findings = report["findings"].as_array().expect("findings");
    assert!(
        findings.iter().any(|f| {
            f["severity"] == "critical"
                && f["message"]
                    .as_str()
                    .is_some_and(|m| m.contains("x86_64 モード"))
        }),
        "report={report}"
    );

    let total = findings.len() as u64;
    let warning = report["summary"]["warning"].as_u64().expect("warning");
    let info = report["summary"]["info"].as_u64().expect("info");
    assert_eq!(critical + warning + info, total);

    assert_eq!(report["host"]["apple_silicon"], true);
    assert_eq!(report["host"]["current_arch"], "x86_64");
    assert_eq!(report["host"]["os_version"], "12.2.1");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn old_macos_on_native_hardware_is_critical() {
    let home = make_temp_home();
    let bin_dir = home.join("bin");
    std::fs::create_dir_all(&bin_dir).expect("mkdir bin");
    write_script(
        bin_dir.join("sysctl").as_path(),
        r#"#!/bin/sh
if [ "$2" = "hw.optional.arm64" ]; then
  echo 1
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
        "#!/bin/sh\necho 10.15.7\nexit 0\n",
    );
    write_script(
        bin_dir.join("xcodebuild").as_path(),
        "#!/bin/sh\necho \"Xcode 14.2\"\nexit 0\n",
    );
    write_script(bin_dir.join("ps").as_path(), "#!/bin/sh\nexit 0\n");
    let path = format!(
        "{}:{}",
        bin_dir.display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let out = run_with_path(&home, &path, &["--json", "scan", "--no-report-file"]);
    assert_eq!(out.status.code(), Some(1));

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse report json");
    let criticals: Vec<_> = report["findings"]
        .as_array()
        .expect("findings")
        .iter()
        .filter(|f| f["severity"] == "critical")
        .collect();
    assert_eq!(criticals.len(), 1, "report={report}");
    assert!(
        criticals[0]["message"]
            .as_str()
            .is_some_and(|m| m.contains("10.15.7")),
        "report={report}"
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn old_xcode_is_critical_even_without_native_hardware_findings() {
    let home = make_temp_home();
    let bin_dir = home.join("bin");
    std::fs::create_dir_all(&bin_dir).expect("mkdir bin");
    write_script(
        bin_dir.join("sysctl").as_path(),
        r#"#!/bin/sh
if [ "$2" = "hw.optional.arm64" ]; then
  echo 1
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
        "#!/bin/sh\necho 12.4\nexit 0\n",
    );
    write_script(
        bin_dir.join("xcodebuild").as_path(),
        "#!/bin/sh\necho \"Xcode 11.7\"\nexit 0\n",
    );
    write_script(bin_dir.join("ps").as_path(), "#!/bin/sh\nexit 0\n");
    let path = format!(
        "{}:{}",
        bin_dir.display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let out = run_with_path(&home, &path, &["--json", "scan", "--no-report-file"]);
    assert_eq!(out.status.code(), Some(1));

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse report json");
    assert!(
        report["findings"]
            .as_array()
            .expect("findings")
            .iter()
            .any(|f| {
                f["severity"] == "critical"
                    && f["message"]
                        .as_str()
                        .is_some_and(|m| m.contains("xcodebuild 11.7"))
            }),
        "report={report}"
    );

    let _ = std::fs::remove_dir_all(&home);
}
