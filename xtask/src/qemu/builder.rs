//! QEMU command builder
//!
//! Arguments always come out in the same order: machine, memory, smp,
//! kernel, firmware, display, debug stub, reboot policy, then whatever the
//! profile appends. Only the values a profile contributes vary between runs.

use crate::targets::{Firmware, TargetProfile};
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};

/// Display configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DisplayMode {
    /// No window, serial and monitor multiplexed on stdio
    #[default]
    Nographic,
    /// display=none, serial on stdio
    Headless,
    /// GTK window, serial on stdio
    Gtk,
}

/// A fully materialised emulator invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLaunch {
    pub emulator: String,
    pub machine: String,
    pub memory: String,
    pub cpus: u32,
    pub firmware: Firmware,
    pub kernel: PathBuf,
    pub args: Vec<String>,
}

impl fmt::Display for ResolvedLaunch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.emulator)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// QEMU command builder with fluent API
#[derive(Clone, Debug)]
pub struct QemuBuilder<'a> {
    profile: &'a TargetProfile,
    kernel: PathBuf,
    display: DisplayMode,
    enable_gdb: bool,
    gdb_wait: bool,
}

impl<'a> QemuBuilder<'a> {
    pub fn new(profile: &'a TargetProfile, kernel: &Path) -> Self {
        Self {
            profile,
            kernel: kernel.to_path_buf(),
            display: DisplayMode::default(),
            enable_gdb: false,
            gdb_wait: false,
        }
    }

    pub fn display(mut self, display: DisplayMode) -> Self {
        self.display = display;
        self
    }

    /// Enable GDB server on port 1234
    pub fn enable_gdb(mut self, wait: bool) -> Self {
        self.enable_gdb = true;
        self.gdb_wait = wait;
        self
    }

    pub fn build(self) -> ResolvedLaunch {
        let p = self.profile;
        let machine = p.machine.to_string();
        let memory = p.memory();
        let mut args: Vec<String> = Vec::new();
        let mut push = |xs: &[&str]| args.extend(xs.iter().map(|s| (*s).to_string()));

        push(&["-machine", &machine]);
        push(&["-m", &memory]);
        push(&["-smp", &p.cpus.to_string()]);
        push(&["-kernel", &self.kernel.to_string_lossy()]);

        if let Firmware::Path(fw) = p.firmware {
            push(&["-bios", fw]);
        }

        match self.display {
            DisplayMode::Nographic => push(&["-nographic"]),
            DisplayMode::Headless => push(&["-display", "none", "-serial", "mon:stdio"]),
            DisplayMode::Gtk => push(&["-display", "gtk", "-serial", "mon:stdio"]),
        }

        if self.enable_gdb {
            push(&["-s"]); // Shorthand for -gdb tcp::1234
            if self.gdb_wait {
                push(&["-S"]); // Freeze CPU at startup
            }
        }

        push(&["-no-reboot"]);

        push(p.extra_args);

        ResolvedLaunch {
            emulator: p.emulator().to_string(),
            machine,
            memory,
            cpus: p.cpus,
            firmware: p.firmware,
            kernel: self.kernel,
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::Preparation;
    use crate::targets::{Arch, Registry};

    const KERNEL: &str = "target/karox/riscv64/release/kernel.elf";

    #[test]
    fn test_builder_basic() {
        let reg = Registry::builtin().unwrap();
        let launch = QemuBuilder::new(reg.resolve("riscv64").unwrap(), Path::new(KERNEL)).build();

        assert_eq!(launch.emulator, "qemu-system-riscv64");
        assert_eq!(
            launch.args,
            [
                "-machine", "virt", "-m", "128M", "-smp", "1", "-kernel", KERNEL, "-nographic",
                "-no-reboot",
            ]
        );
        assert_eq!(launch.firmware, Firmware::Default);
    }

    #[test]
    fn test_firmware_path_goes_after_kernel() {
        let reg = Registry::builtin().unwrap();
        let mut profile = reg.resolve("riscv64").unwrap().clone();
        profile.firmware = Firmware::Path("bootloader/rustsbi-qemu.bin");

        let launch = QemuBuilder::new(&profile, Path::new(KERNEL)).build();

        let kernel = launch.args.iter().position(|a| a == "-kernel").unwrap();
        assert_eq!(launch.args[kernel + 2], "-bios");
        assert_eq!(launch.args[kernel + 3], "bootloader/rustsbi-qemu.bin");
    }

    #[test]
    fn test_same_profile_same_args() {
        let reg = Registry::builtin().unwrap();
        let profile = reg.resolve("loongarch64").unwrap();
        let a = QemuBuilder::new(profile, Path::new(KERNEL)).enable_gdb(true).build();
        let b = QemuBuilder::new(profile, Path::new(KERNEL)).enable_gdb(true).build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_profiles_differ_only_in_contributed_fields() {
        let reg = Registry::builtin().unwrap();
        let up = QemuBuilder::new(reg.resolve("riscv64").unwrap(), Path::new(KERNEL)).build();
        let smp = QemuBuilder::new(reg.resolve("riscv64-smp").unwrap(), Path::new(KERNEL)).build();

        assert_eq!(up.args.len(), smp.args.len());
        let differing: Vec<usize> = (0..up.args.len())
            .filter(|&i| up.args[i] != smp.args[i])
            .collect();
        // Only the -m and -smp values.
        assert_eq!(differing, [3, 5]);
    }

    #[test]
    fn test_extra_fragments_come_last() {
        let reg = Registry::builtin().unwrap();
        let launch = QemuBuilder::new(reg.resolve("loongarch64").unwrap(), Path::new(KERNEL))
            .display(DisplayMode::Headless)
            .build();
        assert_eq!(launch.emulator, "qemu-system-loongarch64");
        assert_eq!(&launch.args[launch.args.len() - 2..], ["-cpu", "la464"]);
        assert!(launch.args.windows(2).any(|w| w == ["-display", "none"]));
    }

    #[test]
    fn test_gdb_flags() {
        let reg = Registry::builtin().unwrap();
        let profile = reg.resolve("riscv64").unwrap();

        let wait = QemuBuilder::new(profile, Path::new(KERNEL)).enable_gdb(true).build();
        assert!(wait.args.windows(2).any(|w| w == ["-s", "-S"]));

        let no_wait = QemuBuilder::new(profile, Path::new(KERNEL)).enable_gdb(false).build();
        assert!(no_wait.args.iter().any(|a| a == "-s"));
        assert!(!no_wait.args.iter().any(|a| a == "-S"));
    }

    #[test]
    fn test_no_reboot_precedes_profile_fragments() {
        let reg = Registry::builtin().unwrap();
        let launch = QemuBuilder::new(reg.resolve("loongarch64").unwrap(), Path::new(KERNEL))
            .enable_gdb(true)
            .build();
        let n = launch.args.len();
        assert_eq!(launch.args[n - 5..], ["-s", "-S", "-no-reboot", "-cpu", "la464"]);
    }

    #[test]
    fn test_display_renders_command_line() {
        let profile = TargetProfile {
            name: "tiny",
            arch: Arch::Riscv64,
            triple: "riscv64gc-unknown-none-elf",
            features: &[],
            firmware: Firmware::Default,
            machine: "virt",
            memory_mib: 64,
            cpus: 2,
            extra_args: &[],
            user_programs: &[],
            preparation: Preparation::NoOp,
        };
        let launch = QemuBuilder::new(&profile, Path::new("k.elf"))
            .display(DisplayMode::Gtk)
            .build();
        assert_eq!(
            launch.to_string(),
            "qemu-system-riscv64 -machine virt -m 64M -smp 2 -kernel k.elf \
             -display gtk -serial mon:stdio -no-reboot"
        );
    }
}
