use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryArch {
    Arm64,
    X86_64,
    UniversalArm64,
    UniversalX86Only,
    Unknown,
}

impl BinaryArch {
    pub const fn label(self) -> &'static str {
        match self {
            BinaryArch::Arm64 => "arm64",
            BinaryArch::X86_64 => "x86_64",
            BinaryArch::UniversalArm64 => "universal（arm64あり）",
            BinaryArch::UniversalX86Only => "universal（x86_64のみ）",
            BinaryArch::Unknown => "不明",
        }
    }

    pub const fn is_native(self) -> bool {
        matches!(self, BinaryArch::Arm64 | BinaryArch::UniversalArm64)
    }

    pub const fn is_foreign_only(self) -> bool {
        matches!(self, BinaryArch::X86_64 | BinaryArch::UniversalX86Only)
    }
}

impl fmt::Display for BinaryArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
