//! Recording toolchain for pipeline tests

use crate::build::BuildMode;
use crate::error::XtaskError;
use crate::qemu::ResolvedLaunch;
use crate::targets::TargetProfile;
use crate::toolchain::Toolchain;
use anyhow::{bail, Result};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    CompileUser(&'static str),
    CompileKernel(&'static str),
    DumpDescription(&'static str),
    TranslateDescription,
    EmulatorVersion(&'static str),
    Launch(Vec<String>),
}

/// Writes plausible files instead of spawning processes, and records every call.
pub struct FakeToolchain {
    pub version_output: String,
    pub exit_code: i32,
    pub fail_user: bool,
    pub fail_kernel_for: Option<&'static str>,
    pub fail_dump: bool,
    pub fail_translate: bool,
    pub artifacts: tempfile::TempDir,
    pub calls: RefCell<Vec<Call>>,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self {
            version_output: "QEMU emulator version 9.1.0 (v9.1.0)\n".to_string(),
            exit_code: 0,
            fail_user: false,
            fail_kernel_for: None,
            fail_dump: false,
            fail_translate: false,
            artifacts: tempfile::tempdir().unwrap(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakeToolchain {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn compile_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::CompileUser(_) | Call::CompileKernel(_)))
            .count()
    }

    pub fn launches(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Launch(args) => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Toolchain for FakeToolchain {
    fn compile_user(&self, profile: &TargetProfile, _mode: BuildMode) -> Result<Vec<PathBuf>> {
        self.record(Call::CompileUser(profile.name));
        if self.fail_user {
            return Err(XtaskError::CompileFailed {
                target: profile.name.to_string(),
                artifact: "user-space".to_string(),
                detail: "cargo exited with exit status: 101".to_string(),
            }
            .into());
        }
        let dir = self.artifacts.path().join(profile.triple);
        fs::create_dir_all(&dir)?;
        profile
            .user_programs
            .iter()
            .map(|p| -> Result<PathBuf> {
                let path = dir.join(p);
                fs::write(&path, format!("{p} for {}", profile.name))?;
                Ok(path)
            })
            .collect()
    }

    fn compile_kernel(
        &self,
        profile: &TargetProfile,
        _mode: BuildMode,
        _runtime_dir: &Path,
        output: &Path,
    ) -> Result<()> {
        self.record(Call::CompileKernel(profile.name));
        if self.fail_kernel_for == Some(profile.name) {
            return Err(XtaskError::CompileFailed {
                target: profile.name.to_string(),
                artifact: "kernel".to_string(),
                detail: "cargo exited with exit status: 101".to_string(),
            }
            .into());
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, "ELF")?;
        Ok(())
    }

    fn dump_description(&self, profile: &TargetProfile, blob: &Path) -> Result<()> {
        self.record(Call::DumpDescription(profile.name));
        if self.fail_dump {
            bail!("qemu-system-loongarch64 exited with exit status: 1");
        }
        fs::write(blob, [0xd0, 0x0d, 0xfe, 0xed])?;
        Ok(())
    }

    fn translate_description(&self, _blob: &Path, source: &Path) -> Result<()> {
        self.record(Call::TranslateDescription);
        if self.fail_translate {
            bail!("dtc exited with exit status: 1");
        }
        fs::write(source, "/dts-v1/;\n/ { };\n")?;
        Ok(())
    }

    fn emulator_version(&self, profile: &TargetProfile) -> Result<String> {
        self.record(Call::EmulatorVersion(profile.name));
        Ok(self.version_output.clone())
    }

    fn launch(&self, launch: ResolvedLaunch) -> Result<i32> {
        self.record(Call::Launch(launch.args));
        Ok(self.exit_code)
    }
}
