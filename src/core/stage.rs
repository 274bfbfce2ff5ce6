use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    System,
    Packages,
    PathOrder,
    Processes,
    Containers,
    Toolchains,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::System,
        Stage::Packages,
        Stage::PathOrder,
        Stage::Processes,
        Stage::Containers,
        Stage::Toolchains,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::System => "system",
            Stage::Packages => "packages",
            Stage::PathOrder => "path",
            Stage::Processes => "processes",
            Stage::Containers => "containers",
            Stage::Toolchains => "toolchains",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Stage::System => "システム（アーキテクチャ/OS）",
            Stage::Packages => "パッケージマネージャ",
            Stage::PathOrder => "PATH",
            Stage::Processes => "実行中プロセス",
            Stage::Containers => "コンテナランタイム",
            Stage::Toolchains => "開発ツールチェーン",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
