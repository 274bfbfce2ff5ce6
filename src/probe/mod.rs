use std::path::{Path, PathBuf};

mod live;

pub use live::LiveProbe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    pub command_path: PathBuf,
    pub runtime_arch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRuntime {
    NotInstalled,
    Idle,
    Running(Vec<ContainerInfo>),
}

/// ホストの生の事実を返す観測面。失敗は常に「情報なし」へ縮退する
/// （None / 空列）。スキャンを中断する失敗は存在しない。
pub trait SystemProbe {
    fn apple_silicon(&self) -> Option<bool>;
    fn current_arch(&self) -> Option<String>;
    fn chip_model(&self) -> Option<String>;
    fn os_version(&self) -> Option<String>;
    fn rosetta_installed(&self) -> Option<bool>;
    fn installed_packages(&self, brew: &Path) -> Option<Vec<String>>;
    fn resolve_executable(&self, name: &str) -> Option<PathBuf>;
    fn describe_binary(&self, path: &Path) -> Option<String>;
    fn tool_version(&self, name: &str, path: &Path) -> Option<String>;
    fn processes(&self) -> Option<Vec<ProcessInfo>>;
    fn path_entries(&self) -> Vec<PathBuf>;
    fn container_runtime(&self) -> ContainerRuntime;
    fn container_arch(&self, id: &str) -> Option<String>;
    fn container_runtime_config(&self) -> Option<String>;
    fn file_exists(&self, path: &Path) -> bool;
    fn dir_exists(&self, path: &Path) -> bool;
}
