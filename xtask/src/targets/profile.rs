//! Build target profiles

use crate::prepare::Preparation;
use serde::Serialize;

/// Target architecture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Riscv64,
    LoongArch64,
}

impl Arch {
    /// Returns the QEMU binary name for this architecture
    pub fn qemu_binary(&self) -> &'static str {
        match self {
            Arch::Riscv64 => "qemu-system-riscv64",
            Arch::LoongArch64 => "qemu-system-loongarch64",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Arch::Riscv64 => "riscv64",
            Arch::LoongArch64 => "loongarch64",
        }
    }
}

/// Firmware handed to the emulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    /// Let QEMU pick its bundled firmware (OpenSBI on riscv64 virt)
    Default,
    /// Explicit firmware image, relative to the repo root
    #[allow(dead_code)] // every built-in target boots QEMU's bundled firmware
    Path(&'static str),
}

/// A named, immutable bundle of build and emulation parameters.
#[derive(Clone, Debug, Serialize)]
pub struct TargetProfile {
    pub name: &'static str,
    pub arch: Arch,
    /// Rust target triple for both kernel and user-space builds
    pub triple: &'static str,
    /// Cargo features enabled on the kernel package
    pub features: &'static [&'static str],
    pub firmware: Firmware,
    pub machine: &'static str,
    pub memory_mib: u32,
    pub cpus: u32,
    /// Appended verbatim after the fixed arguments
    pub extra_args: &'static [&'static str],
    /// User-space binaries staged into the runtime directory
    pub user_programs: &'static [&'static str],
    pub preparation: Preparation,
}

impl TargetProfile {
    /// `-m` value
    pub fn memory(&self) -> String {
        format!("{}M", self.memory_mib)
    }

    pub fn emulator(&self) -> &'static str {
        self.arch.qemu_binary()
    }
}
