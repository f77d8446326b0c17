//! Registry of build targets
//!
//! Built once at startup and passed by reference; nothing mutates it.

use super::profile::{Arch, Firmware, TargetProfile};
use crate::error::XtaskError;
use crate::prepare::{DescriptionExtraction, Preparation};

const DEFAULT_TARGET: &str = "riscv64";

const BUILTIN: &[TargetProfile] = &[
    TargetProfile {
        name: "riscv64",
        arch: Arch::Riscv64,
        triple: "riscv64gc-unknown-none-elf",
        features: &["naked"],
        firmware: Firmware::Default,
        machine: "virt",
        memory_mib: 128,
        cpus: 1,
        extra_args: &[],
        user_programs: &["init"],
        preparation: Preparation::NoOp,
    },
    TargetProfile {
        name: "riscv64-smp",
        arch: Arch::Riscv64,
        triple: "riscv64gc-unknown-none-elf",
        features: &["naked"],
        firmware: Firmware::Default,
        machine: "virt",
        memory_mib: 512,
        cpus: 4,
        extra_args: &[],
        user_programs: &["init"],
        preparation: Preparation::NoOp,
    },
    TargetProfile {
        name: "loongarch64",
        arch: Arch::LoongArch64,
        triple: "loongarch64-unknown-none",
        features: &["naked"],
        firmware: Firmware::Default,
        machine: "virt",
        memory_mib: 1024,
        cpus: 1,
        extra_args: &["-cpu", "la464"],
        user_programs: &["init"],
        // The kernel embeds the blob, so it has to exist before compilation.
        preparation: Preparation::ExtractAndTranslate(DescriptionExtraction {
            blob: "qemu-loongarch64.dtb",
            source: "qemu-loongarch64.dts",
        }),
    },
];

#[derive(Debug)]
pub struct Registry {
    profiles: Vec<TargetProfile>,
    default: &'static str,
}

impl Registry {
    pub fn builtin() -> Result<Self, XtaskError> {
        Self::new(BUILTIN.to_vec(), DEFAULT_TARGET)
    }

    pub fn new(profiles: Vec<TargetProfile>, default: &'static str) -> Result<Self, XtaskError> {
        for (i, p) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|q| q.name == p.name) {
                return Err(XtaskError::DuplicateTarget(p.name.to_string()));
            }
        }
        if !profiles.iter().any(|p| p.name == default) {
            return Err(XtaskError::UnknownDefaultTarget(default.to_string()));
        }
        Ok(Self { profiles, default })
    }

    pub fn resolve(&self, name: &str) -> Result<&TargetProfile, XtaskError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| XtaskError::UnknownTarget {
                name: name.to_string(),
                known: self.all_targets().join(", "),
            })
    }

    pub fn default_target(&self) -> &str {
        self.default
    }

    /// Target names in declaration order
    pub fn all_targets(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name).collect()
    }

    pub fn profiles(&self) -> &[TargetProfile] {
        &self.profiles
    }
}
