//! Kernel build pipeline
//!
//! pre-compile preparation → user-space → staging → kernel. Each step must
//! finish before the next starts, and the first failure ends the build.
//! Preparation comes first so a failed extraction never leaves a half-built
//! tree behind.

use crate::error::XtaskError;
use crate::targets::{Registry, TargetProfile};
use crate::toolchain::Toolchain;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_TEMPLATE: &str = "target/karox/{target}/{mode}/kernel.elf";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Release,
    Debug,
}

impl BuildMode {
    /// Directory cargo puts artifacts in for this mode
    pub fn cargo_dir(&self) -> &'static str {
        match self {
            BuildMode::Release => "release",
            BuildMode::Debug => "debug",
        }
    }
}

/// Which target to build, how, and where the kernel image lands.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub target: String,
    pub mode: BuildMode,
    output_template: String,
}

impl BuildConfig {
    /// The template must name both `{mode}` and `{target}` so every
    /// (mode, target) pair gets its own image.
    pub fn new(target: &str, mode: BuildMode, output_template: &str) -> Result<Self, XtaskError> {
        if !output_template.contains("{mode}") || !output_template.contains("{target}") {
            return Err(XtaskError::InvalidOutputTemplate(output_template.to_string()));
        }
        Ok(Self {
            target: target.to_string(),
            mode,
            output_template: output_template.to_string(),
        })
    }

    /// Kernel image path, relative to the repo root unless the template is absolute.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(
            self.output_template
                .replace("{mode}", self.mode.cargo_dir())
                .replace("{target}", &self.target),
        )
    }
}

/// On-disk layout of a checkout.
#[derive(Clone, Debug)]
pub struct Layout {
    pub root: PathBuf,
    pub runtime_dir: PathBuf,
}

impl Layout {
    pub fn new(root: &Path, runtime_dir: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            runtime_dir: root.join(runtime_dir),
        }
    }

    pub fn target_runtime(&self, target: &str) -> PathBuf {
        self.runtime_dir.join(target)
    }

    /// Staged user-space programs
    pub fn user_stage(&self, target: &str) -> PathBuf {
        self.target_runtime(target).join("user")
    }

    /// Reset-per-run directory for preparation outputs
    pub fn scratch(&self, target: &str) -> PathBuf {
        self.target_runtime(target).join("hw")
    }

    /// Where preparation outputs are copied for the kernel build to embed
    pub fn publish_dir(&self) -> &Path {
        &self.runtime_dir
    }

    pub fn kernel_image(&self, config: &BuildConfig) -> PathBuf {
        self.root.join(config.output_path())
    }
}

pub struct Orchestrator<'a> {
    pub registry: &'a Registry,
    pub layout: &'a Layout,
    pub toolchain: &'a dyn Toolchain,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a Registry, layout: &'a Layout, toolchain: &'a dyn Toolchain) -> Self {
        Self {
            registry,
            layout,
            toolchain,
        }
    }

    /// Build one target and return the kernel image path.
    pub fn build(&self, config: &BuildConfig) -> Result<PathBuf> {
        let profile = self.registry.resolve(&config.target)?;
        log::info!(
            "Building {} ({}, {})",
            profile.name,
            profile.triple,
            config.mode.cargo_dir()
        );

        log::info!("[1/4] preparing {}", profile.name);
        profile.preparation.run_pre_compile(
            profile,
            &self.layout.scratch(profile.name),
            self.layout.publish_dir(),
            self.toolchain,
        )?;

        log::info!("[2/4] user-space: {}", profile.user_programs.join(", "));
        let artifacts = self.toolchain.compile_user(profile, config.mode)?;

        let stage = self.layout.user_stage(profile.name);
        log::info!("[3/4] staging {} artifact(s) into {}", artifacts.len(), stage.display());
        stage_artifacts(&artifacts, &stage)?;

        let image = self.layout.kernel_image(config);
        log::info!("[4/4] kernel → {}", image.display());
        self.toolchain.compile_kernel(
            profile,
            config.mode,
            &self.layout.target_runtime(profile.name),
            &image,
        )?;

        log::info!("Built {}: {}", profile.name, image.display());
        Ok(image)
    }

    /// Build every registered target in order, stopping at the first failure.
    pub fn build_all(&self, mode: BuildMode, output_template: &str) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        for name in self.registry.all_targets() {
            let config = BuildConfig::new(name, mode, output_template)?;
            let image = self
                .build(&config)
                .with_context(|| format!("Build failed for {name}"))?;
            images.push(image);
        }
        Ok(images)
    }

    pub fn profile(&self, config: &BuildConfig) -> Result<&'a TargetProfile> {
        Ok(self.registry.resolve(&config.target)?)
    }
}

fn stage_artifacts(artifacts: &[PathBuf], stage: &Path) -> Result<()> {
    if stage.exists() {
        fs::remove_dir_all(stage).with_context(|| format!("Removing {}", stage.display()))?;
    }
    fs::create_dir_all(stage).with_context(|| format!("Creating {}", stage.display()))?;

    for src in artifacts {
        let name = src
            .file_name()
            .with_context(|| format!("Artifact has no file name: {}", src.display()))?;
        fs::copy(src, stage.join(name))
            .with_context(|| format!("Staging {}", src.display()))?;
        log::debug!("  staged {}", src.display());
    }
    Ok(())
}
