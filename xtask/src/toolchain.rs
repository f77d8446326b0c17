//! External tools the pipeline drives
//!
//! Every process the build and launch steps spawn goes through [`Toolchain`]:
//! cargo for user-space and the kernel, QEMU in introspection and execution
//! mode, and `dtc` for the device tree translation. Each call blocks until
//! the process exits.

use crate::build::BuildMode;
use crate::error::XtaskError;
use crate::qemu::ResolvedLaunch;
use crate::targets::TargetProfile;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Environment variable the kernel build reads to find staged files
pub const RUNTIME_DIR_ENV: &str = "KAROX_RUNTIME_DIR";

pub trait Toolchain {
    /// Build the profile's user-space programs, returning their paths.
    fn compile_user(&self, profile: &TargetProfile, mode: BuildMode) -> Result<Vec<PathBuf>>;

    /// Build the kernel and leave the image at `output`.
    fn compile_kernel(
        &self,
        profile: &TargetProfile,
        mode: BuildMode,
        runtime_dir: &Path,
        output: &Path,
    ) -> Result<()>;

    /// Run the emulator in introspection mode, writing the binary device tree to `blob`.
    fn dump_description(&self, profile: &TargetProfile, blob: &Path) -> Result<()>;

    /// Convert a binary device tree into its source form.
    fn translate_description(&self, blob: &Path, source: &Path) -> Result<()>;

    /// Raw output of `<emulator> --version`.
    fn emulator_version(&self, profile: &TargetProfile) -> Result<String>;

    /// Run the emulator to completion and return its exit code.
    fn launch(&self, launch: ResolvedLaunch) -> Result<i32>;
}

/// Spawns the real host tools.
#[derive(Clone, Debug)]
pub struct HostToolchain {
    pub root: PathBuf,
    /// Kernel crate, relative to the root
    pub kernel_dir: PathBuf,
    /// Binary the kernel crate produces
    pub kernel_bin: String,
    /// User-space workspace, relative to the root
    pub user_dir: PathBuf,
    pub qemu_prefix: Option<PathBuf>,
}

impl HostToolchain {
    /// Path of a QEMU binary, honouring the configured prefix.
    pub fn qemu(&self, binary: &str) -> PathBuf {
        match &self.qemu_prefix {
            Some(prefix) => prefix.join(binary),
            None => PathBuf::from(binary),
        }
    }

    /// Each crate gets its own target dir under `<root>/target`, so artifact
    /// paths don't depend on which workspace the crate belongs to.
    fn target_dir(&self, which: &str) -> PathBuf {
        self.root.join("target").join(which)
    }

    fn cargo_build(
        &self,
        crate_dir: &Path,
        which: &str,
        profile: &TargetProfile,
        mode: BuildMode,
    ) -> Command {
        let mut cmd = Command::new("cargo");
        cmd.current_dir(&self.root)
            .arg("build")
            .arg("--manifest-path")
            .arg(self.root.join(crate_dir).join("Cargo.toml"))
            .arg("--target-dir")
            .arg(self.target_dir(which))
            .args(["--target", profile.triple]);
        if mode == BuildMode::Release {
            cmd.arg("--release");
        }
        cmd
    }

    /// QEMU in introspection mode: same machine shape as a real boot, but
    /// it writes the device tree and exits.
    fn dump_command(&self, profile: &TargetProfile, blob: &Path) -> Command {
        let mut cmd = Command::new(self.qemu(profile.emulator()));
        cmd.arg("-machine")
            .arg(format!("{},dumpdtb={}", profile.machine, blob.display()))
            .args(["-m", &profile.memory()])
            .args(["-smp", &profile.cpus.to_string()])
            .arg("-nographic")
            .stdin(Stdio::null());
        cmd
    }

    fn translate_command(blob: &Path, source: &Path) -> Command {
        let mut cmd = Command::new("dtc");
        cmd.args(["-I", "dtb", "-O", "dts", "-o"]).arg(source).arg(blob);
        cmd
    }
}

impl Toolchain for HostToolchain {
    fn compile_user(&self, profile: &TargetProfile, mode: BuildMode) -> Result<Vec<PathBuf>> {
        if profile.user_programs.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = self.cargo_build(&self.user_dir, "user", profile, mode);
        for program in profile.user_programs {
            cmd.args(["--bin", program]);
        }

        let status = run_status(&mut cmd)?;
        if !status.success() {
            return Err(XtaskError::CompileFailed {
                target: profile.name.to_string(),
                artifact: "user-space".to_string(),
                detail: format!("cargo exited with {status}"),
            }
            .into());
        }

        let out_dir = self
            .target_dir("user")
            .join(profile.triple)
            .join(mode.cargo_dir());
        let mut artifacts = Vec::with_capacity(profile.user_programs.len());
        for program in profile.user_programs {
            let path = out_dir.join(program);
            if !path.is_file() {
                return Err(XtaskError::CompileFailed {
                    target: profile.name.to_string(),
                    artifact: (*program).to_string(),
                    detail: format!("expected binary at {}", path.display()),
                }
                .into());
            }
            artifacts.push(path);
        }
        Ok(artifacts)
    }

    fn compile_kernel(
        &self,
        profile: &TargetProfile,
        mode: BuildMode,
        runtime_dir: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut cmd = self.cargo_build(&self.kernel_dir, "kernel", profile, mode);
        cmd.env(RUNTIME_DIR_ENV, runtime_dir);
        if !profile.features.is_empty() {
            cmd.args(["--features", &profile.features.join(",")]);
        }

        let status = run_status(&mut cmd)?;
        if !status.success() {
            return Err(XtaskError::CompileFailed {
                target: profile.name.to_string(),
                artifact: "kernel".to_string(),
                detail: format!("cargo exited with {status}"),
            }
            .into());
        }

        let elf = self
            .target_dir("kernel")
            .join(profile.triple)
            .join(mode.cargo_dir())
            .join(&self.kernel_bin);
        if !elf.is_file() {
            return Err(XtaskError::CompileFailed {
                target: profile.name.to_string(),
                artifact: "kernel".to_string(),
                detail: format!("expected kernel at {}", elf.display()),
            }
            .into());
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating {}", parent.display()))?;
        }
        fs::copy(&elf, output)
            .with_context(|| format!("Copying {} to {}", elf.display(), output.display()))?;
        Ok(())
    }

    fn dump_description(&self, profile: &TargetProfile, blob: &Path) -> Result<()> {
        let qemu = self.qemu(profile.emulator());
        let mut cmd = self.dump_command(profile, blob);

        let status = run_status(&mut cmd)?;
        if !status.success() {
            bail!("{} exited with {status}", qemu.display());
        }
        if !blob.is_file() {
            bail!("{} did not write {}", qemu.display(), blob.display());
        }
        Ok(())
    }

    fn translate_description(&self, blob: &Path, source: &Path) -> Result<()> {
        let mut cmd = Self::translate_command(blob, source);

        let status = run_status(&mut cmd)?;
        if !status.success() {
            bail!("dtc exited with {status}");
        }
        Ok(())
    }

    fn emulator_version(&self, profile: &TargetProfile) -> Result<String> {
        let qemu = self.qemu(profile.emulator());
        log::debug!("$ {} --version", qemu.display());
        let out = Command::new(&qemu)
            .arg("--version")
            .output()
            .with_context(|| format!("Running {}", qemu.display()))?;
        if !out.status.success() {
            return Err(XtaskError::VersionQueryFailed {
                emulator: qemu.display().to_string(),
                output: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&out.stdout).to_string())
    }

    fn launch(&self, launch: ResolvedLaunch) -> Result<i32> {
        let qemu = self.qemu(&launch.emulator);
        let mut cmd = Command::new(&qemu);
        cmd.args(&launch.args)
            .current_dir(&self.root)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = run_status(&mut cmd)?;
        // Killed by a signal: no code, report a plain failure.
        Ok(status.code().unwrap_or(1))
    }
}

fn run_status(cmd: &mut Command) -> Result<ExitStatus> {
    log::debug!("$ {:?}", cmd);
    cmd.status()
        .with_context(|| format!("Spawning {:?}", cmd.get_program()))
}
