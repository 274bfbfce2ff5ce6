/// arm64 ネイティブ版 Homebrew の標準プレフィックス。
pub const ARM_PREFIX: &str = "/opt/homebrew";

/// Intel（x86_64）版 Homebrew の標準プレフィックス。
pub const INTEL_PREFIX: &str = "/usr/local";

/// Apple Silicon をサポートする最初の macOS メジャーバージョン（Big Sur）。
pub const MIN_MACOS_MAJOR_FOR_ARM: u32 = 11;

/// プロセススキャンで個別に報告する開発ツール名。
/// 判定はデータであってロジックではない（差し替え可能にしておく）。
pub const DEV_TOOLS: &[&str] = &[
    "git", "clang", "gcc", "make", "cmake", "node", "npm", "python3", "ruby", "perl", "go",
    "rustc", "cargo", "java", "swift",
];

/// ネイティブ拡張を含みやすく、arm64 移行後に再ビルドが必要になり得る
/// Homebrew パッケージ（ヒューリスティック）。
pub const NATIVE_EXT_PACKAGES: &[&str] = &[
    "python",
    "python@3.11",
    "python@3.12",
    "node",
    "ruby",
    "openssl",
    "openssl@3",
    "libffi",
    "readline",
    "postgresql",
    "mysql",
    "sqlite",
    "imagemagick",
    "vim",
];

#[derive(Debug, Clone, Copy)]
pub struct Toolchain {
    pub name: &'static str,
    /// arm64 をサポートする最初のメジャーバージョン。None なら下限なし。
    pub min_native_major: Option<u32>,
}

pub const TOOLCHAINS: &[Toolchain] = &[
    Toolchain {
        name: "xcodebuild",
        min_native_major: Some(12),
    },
    Toolchain {
        name: "git",
        min_native_major: None,
    },
    Toolchain {
        name: "clang",
        min_native_major: None,
    },
    Toolchain {
        name: "make",
        min_native_major: None,
    },
    Toolchain {
        name: "cmake",
        min_native_major: None,
    },
    Toolchain {
        name: "node",
        min_native_major: None,
    },
    Toolchain {
        name: "python3",
        min_native_major: None,
    },
    Toolchain {
        name: "ruby",
        min_native_major: None,
    },
    Toolchain {
        name: "go",
        min_native_major: None,
    },
    Toolchain {
        name: "rustc",
        min_native_major: None,
    },
    Toolchain {
        name: "java",
        min_native_major: None,
    },
    Toolchain {
        name: "swift",
        min_native_major: None,
    },
];

pub fn is_dev_tool(basename: &str) -> bool {
    DEV_TOOLS.contains(&basename)
}

pub fn is_native_ext_package(name: &str) -> bool {
    NATIVE_EXT_PACKAGES.contains(&name)
}
