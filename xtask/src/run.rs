//! Launching a built kernel under QEMU
//!
//! The emulator version is checked before every launch; an emulator older
//! than the configured minimum never gets to execute the kernel.

use crate::build::{BuildConfig, Orchestrator};
use crate::error::XtaskError;
use crate::qemu::{DisplayMode, QemuBuilder, ResolvedLaunch};
use crate::targets::TargetProfile;
use crate::version;
use anyhow::Result;

#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    pub display: DisplayMode,
    pub gdb: bool,
    pub gdb_wait: bool,
    /// Print the command instead of executing it
    pub dry_run: bool,
}

pub struct LaunchAssembler<'a> {
    orchestrator: Orchestrator<'a>,
    min_version: String,
    options: LaunchOptions,
}

impl<'a> LaunchAssembler<'a> {
    pub fn new(orchestrator: Orchestrator<'a>, min_version: &str, options: LaunchOptions) -> Self {
        Self {
            orchestrator,
            min_version: min_version.to_string(),
            options,
        }
    }

    /// Build, then launch. Returns the emulator's exit code.
    pub fn run(&self, config: &BuildConfig) -> Result<i32> {
        self.orchestrator.build(config)?;
        self.run_only(config)
    }

    /// Launch whatever was last built for `config`.
    pub fn run_only(&self, config: &BuildConfig) -> Result<i32> {
        let profile = self.orchestrator.profile(config)?;
        let layout = self.orchestrator.layout;
        let toolchain = self.orchestrator.toolchain;

        profile.preparation.run_pre_run(
            profile,
            &layout.scratch(profile.name),
            layout.publish_dir(),
            toolchain,
        )?;

        self.check_emulator(profile)?;

        let launch = self.assemble(profile, config);
        if self.options.dry_run {
            println!("{launch}");
            return Ok(0);
        }

        log::info!(
            "Launching {} on {} ({}, {} RAM, {} cpu(s), firmware {:?}, kernel {})",
            profile.name,
            launch.emulator,
            launch.machine,
            launch.memory,
            launch.cpus,
            launch.firmware,
            launch.kernel.display()
        );
        log::debug!("{launch}");
        let code = toolchain.launch(launch)?;
        if code != 0 {
            log::warn!("{} exited with code {code}", profile.emulator());
        }
        Ok(code)
    }

    pub fn assemble(&self, profile: &TargetProfile, config: &BuildConfig) -> ResolvedLaunch {
        // Relative to the repo root, which is where the emulator runs.
        let mut builder =
            QemuBuilder::new(profile, &config.output_path()).display(self.options.display);
        if self.options.gdb || self.options.gdb_wait {
            builder = builder.enable_gdb(self.options.gdb_wait);
        }
        builder.build()
    }

    fn check_emulator(&self, profile: &TargetProfile) -> Result<()> {
        let emulator = profile.emulator();
        let output = self.orchestrator.toolchain.emulator_version(profile)?;
        let actual = version::extract_version(&output).ok_or_else(|| {
            XtaskError::VersionQueryFailed {
                emulator: emulator.to_string(),
                output: output.trim().to_string(),
            }
        })?;
        let actual = actual.to_string();

        if !version::meets_minimum(&self.min_version, &actual)? {
            return Err(XtaskError::UnsupportedEmulatorVersion {
                emulator: emulator.to_string(),
                required: self.min_version.clone(),
                actual,
            }
            .into());
        }
        log::info!("{emulator} {actual} (>= {})", self.min_version);
        Ok(())
    }
}
