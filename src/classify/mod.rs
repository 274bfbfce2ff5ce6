use std::path::Path;

use crate::core::BinaryArch;
use crate::probe::SystemProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    Missing,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub arch: BinaryArch,
    pub unknown_reason: Option<UnknownReason>,
}

impl Classification {
    const fn known(arch: BinaryArch) -> Self {
        Self {
            arch,
            unknown_reason: None,
        }
    }

    const fn unknown(reason: UnknownReason) -> Self {
        Self {
            arch: BinaryArch::Unknown,
            unknown_reason: Some(reason),
        }
    }
}

/// `file -b` 相当の記述テキストを Mach-O アーキテクチャへ分類する。
/// 純関数。未知の入力は常に Unknown（失敗しない）。
pub fn classify_descriptor(descriptor: &str) -> BinaryArch {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        return BinaryArch::Unknown;
    }

    if is_universal(descriptor) {
        if has_arm64_slice(descriptor) {
            return BinaryArch::UniversalArm64;
        }
        if descriptor.contains("x86_64") {
            return BinaryArch::UniversalX86Only;
        }
        return BinaryArch::Unknown;
    }

    if !descriptor.contains("Mach-O 64-bit") {
        return BinaryArch::Unknown;
    }
    if has_arm64_slice(descriptor) {
        return BinaryArch::Arm64;
    }
    if descriptor.contains("x86_64") {
        return BinaryArch::X86_64;
    }
    BinaryArch::Unknown
}

pub fn classify_path(probe: &dyn SystemProbe, path: &Path) -> Classification {
    if !probe.file_exists(path) {
        return Classification::unknown(UnknownReason::Missing);
    }
    let Some(descriptor) = probe.describe_binary(path) else {
        return Classification::unknown(UnknownReason::Unrecognized);
    };
    match classify_descriptor(&descriptor) {
        BinaryArch::Unknown => Classification::unknown(UnknownReason::Unrecognized),
        arch => Classification::known(arch),
    }
}

fn is_universal(descriptor: &str) -> bool {
    descriptor.contains("universal binary")
}

fn has_arm64_slice(descriptor: &str) -> bool {
    // arm64e も含む
    descriptor.contains("arm64")
}
