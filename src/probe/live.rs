use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::classify;
use crate::core::BinaryArch;
use crate::platform;
use crate::probe::{ContainerInfo, ContainerRuntime, ProcessInfo, SystemProbe};

#[derive(Debug, Clone)]
pub struct LiveProbe {
    timeout: Duration,
    deadline: Option<Instant>,
    home_dir: PathBuf,
}

impl LiveProbe {
    pub fn new(timeout: Duration, deadline: Option<Instant>, home_dir: PathBuf) -> Self {
        Self {
            timeout,
            deadline,
            home_dir,
        }
    }

    fn command_timeout(&self) -> Duration {
        let Some(deadline) = self.deadline else {
            return self.timeout;
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        std::cmp::min(self.timeout, remaining)
    }

    fn run(&self, cmd: &str, args: &[&str]) -> Option<String> {
        let timeout = self.command_timeout();
        if timeout == Duration::from_secs(0) {
            return None;
        }
        match platform::run_command(cmd, args, timeout) {
            Ok(out) if out.exit_code == 0 => Some(out.stdout),
            _ => None,
        }
    }

    fn run_as_invoking_user(&self, cmd: &str, args: &[&str]) -> Option<String> {
        let timeout = self.command_timeout();
        if timeout == Duration::from_secs(0) {
            return None;
        }
        match platform::run_command_invoking_user(cmd, args, timeout) {
            Ok(out) if out.exit_code == 0 => Some(out.stdout),
            _ => None,
        }
    }
}

impl SystemProbe for LiveProbe {
    fn apple_silicon(&self) -> Option<bool> {
        let timeout = self.command_timeout();
        if timeout == Duration::from_secs(0) {
            return None;
        }
        let out = platform::run_command("sysctl", &["-n", "hw.optional.arm64"], timeout).ok()?;
        if out.exit_code != 0 {
            // Intel 機では hw.optional.arm64 自体が存在しない
            return Some(false);
        }
        Some(out.stdout.trim() == "1")
    }

    fn current_arch(&self) -> Option<String> {
        self.run("uname", &["-m"]).map(|s| s.trim().to_string())
    }

    fn chip_model(&self) -> Option<String> {
        self.run("sysctl", &["-n", "machdep.cpu.brand_string"])
            .map(|s| s.trim().to_string())
    }

    fn os_version(&self) -> Option<String> {
        self.run("sw_vers", &["-productVersion"])
            .map(|s| s.trim().to_string())
    }

    fn rosetta_installed(&self) -> Option<bool> {
        Some(Path::new("/Library/Apple/usr/share/rosetta/rosetta").is_file())
    }

    fn installed_packages(&self, brew: &Path) -> Option<Vec<String>> {
        let brew_s = brew.display().to_string();
        let out = self.run_as_invoking_user(&brew_s, &["list", "--formula"])?;
        Some(
            out.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    fn resolve_executable(&self, name: &str) -> Option<PathBuf> {
        for dir in self.path_entries() {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn describe_binary(&self, path: &Path) -> Option<String> {
        let path_s = path.display().to_string();
        self.run("file", &["-b", &path_s])
            .map(|s| s.trim().to_string())
    }

    fn tool_version(&self, name: &str, path: &Path) -> Option<String> {
        let path_s = path.display().to_string();
        // xcodebuild だけは `--version` を受け付けない
        let args: &[&str] = if name == "xcodebuild" {
            &["-version"]
        } else {
            &["--version"]
        };
        let out = self.run(&path_s, args)?;
        extract_version(&out)
    }

    fn processes(&self) -> Option<Vec<ProcessInfo>> {
        let out = self.run("ps", &["-axo", "pid=,comm="])?;
        let entries = parse_ps_output(&out);

        // 同一パスのプロセスが大量に並ぶため、分類は一度だけ
        let mut arch_by_path: HashMap<PathBuf, String> = HashMap::new();
        let mut processes = Vec::with_capacity(entries.len());
        for (pid, path) in entries {
            let runtime_arch = arch_by_path
                .entry(path.clone())
                .or_insert_with(|| {
                    if !path.is_absolute() {
                        return String::new();
                    }
                    match self.describe_binary(&path) {
                        Some(descriptor) => runtime_arch_label(classify::classify_descriptor(
                            &descriptor,
                        )),
                        None => String::new(),
                    }
                })
                .clone();
            processes.push(ProcessInfo {
                pid,
                command_path: path,
                runtime_arch,
            });
        }
        Some(processes)
    }

    fn path_entries(&self) -> Vec<PathBuf> {
        let Some(path) = std::env::var_os("PATH") else {
            return Vec::new();
        };
        std::env::split_paths(&path).collect()
    }

    fn container_runtime(&self) -> ContainerRuntime {
        if self.resolve_executable("docker").is_none() {
            return ContainerRuntime::NotInstalled;
        }
        let Some(out) =
            self.run_as_invoking_user("docker", &["ps", "--format", "{{.ID}}\t{{.Image}}"])
        else {
            // CLI はあるがデーモンが応答しない
            return ContainerRuntime::Idle;
        };
        let containers = out
            .lines()
            .filter_map(|line| {
                let (id, image) = line.trim().split_once('\t')?;
                if id.is_empty() {
                    return None;
                }
                Some(ContainerInfo {
                    id: id.to_string(),
                    image: image.to_string(),
                })
            })
            .collect();
        ContainerRuntime::Running(containers)
    }

    fn container_arch(&self, id: &str) -> Option<String> {
        let image = self
            .run_as_invoking_user("docker", &["inspect", "--format", "{{.Image}}", id])?
            .trim()
            .to_string();
        if image.is_empty() {
            return None;
        }
        let arch = self.run_as_invoking_user(
            "docker",
            &["image", "inspect", "--format", "{{.Architecture}}", &image],
        )?;
        let arch = arch.trim().to_string();
        if arch.is_empty() { None } else { Some(arch) }
    }

    fn container_runtime_config(&self) -> Option<String> {
        std::fs::read_to_string(self.home_dir.join(".docker/config.json")).ok()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

fn runtime_arch_label(arch: BinaryArch) -> String {
    match arch {
        BinaryArch::Arm64 | BinaryArch::UniversalArm64 => "arm64".to_string(),
        BinaryArch::X86_64 | BinaryArch::UniversalX86Only => "x86_64".to_string(),
        BinaryArch::Unknown => String::new(),
    }
}

fn parse_ps_output(stdout: &str) -> Vec<(i32, PathBuf)> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (pid_s, comm) = line.split_once(char::is_whitespace)?;
            let pid = pid_s.trim().parse::<i32>().ok()?;
            let comm = comm.trim();
            if comm.is_empty() {
                return None;
            }
            Some((pid, PathBuf::from(comm)))
        })
        .collect()
}

fn extract_version(output: &str) -> Option<String> {
    for token in output.split_whitespace() {
        let token = token.trim_start_matches('v');
        let looks_like_version = token
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
            && token.contains('.')
            && token
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c.is_ascii_alphanumeric());
        if looks_like_version {
            return Some(token.to_string());
        }
    }
    None
}
