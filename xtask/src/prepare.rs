//! Per-target preparation stages
//!
//! Some targets need files generated on the host before the kernel can be
//! compiled or launched. LoongArch embeds the QEMU `virt` device tree in the
//! kernel image, so the blob is dumped from QEMU itself and translated to
//! source form for inspection. Everything else needs nothing.
//!
//! Extraction works in a per-target scratch directory, then copies the
//! results into the publish directory, which is where the kernel build
//! `.incbin`s the blob from (`runtime/qemu-loongarch64.dtb`).

use crate::error::XtaskError;
use crate::targets::TargetProfile;
use crate::toolchain::Toolchain;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Device tree dump + translation. File names are relative to both the
/// scratch and the publish directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DescriptionExtraction {
    pub blob: &'static str,
    pub source: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Preparation {
    NoOp,
    ExtractAndTranslate(DescriptionExtraction),
}

impl Preparation {
    /// Runs before any compiler call, user-space included.
    ///
    /// For extraction targets the scratch directory is wiped and recreated
    /// first, so nothing from a previous invocation survives.
    pub fn run_pre_compile(
        &self,
        profile: &TargetProfile,
        scratch: &Path,
        publish: &Path,
        toolchain: &dyn Toolchain,
    ) -> Result<()> {
        match self {
            Preparation::NoOp => {
                log::debug!("{}: nothing to prepare", profile.name);
                Ok(())
            }
            Preparation::ExtractAndTranslate(ex) => {
                reset_dir(scratch)
                    .map_err(|e| failed(profile, "resetting scratch directory", &e))?;
                ex.extract(profile, scratch, toolchain)?;
                ex.publish(scratch, publish)
                    .map_err(|e| failed(profile, "publishing device tree", &e))
            }
        }
    }

    /// Runs before launching the emulator.
    ///
    /// Re-extracts when the description files are gone, e.g. `run-only`
    /// after `clean`.
    pub fn run_pre_run(
        &self,
        profile: &TargetProfile,
        scratch: &Path,
        publish: &Path,
        toolchain: &dyn Toolchain,
    ) -> Result<()> {
        match self {
            Preparation::NoOp => Ok(()),
            Preparation::ExtractAndTranslate(ex) => {
                if ex.is_staged(scratch) && ex.is_staged(publish) {
                    log::debug!("{}: device tree already staged", profile.name);
                    return Ok(());
                }
                log::info!("{}: device tree missing, extracting again", profile.name);
                self.run_pre_compile(profile, scratch, publish, toolchain)
            }
        }
    }
}

impl DescriptionExtraction {
    fn is_staged(&self, dir: &Path) -> bool {
        dir.join(self.blob).is_file() && dir.join(self.source).is_file()
    }

    /// Files this extraction leaves in `dir`
    pub fn outputs(&self, dir: &Path) -> [PathBuf; 2] {
        [dir.join(self.blob), dir.join(self.source)]
    }

    fn extract(
        &self,
        profile: &TargetProfile,
        scratch: &Path,
        toolchain: &dyn Toolchain,
    ) -> Result<()> {
        let blob = scratch.join(self.blob);
        let source = scratch.join(self.source);

        log::info!("{}: dumping device tree to {}", profile.name, blob.display());
        toolchain
            .dump_description(profile, &blob)
            .map_err(|e| failed(profile, "device tree dump", &e))?;

        log::info!("{}: translating device tree to {}", profile.name, source.display());
        toolchain
            .translate_description(&blob, &source)
            .map_err(|e| failed(profile, "device tree translation", &e))?;

        Ok(())
    }

    fn publish(&self, scratch: &Path, publish: &Path) -> Result<()> {
        fs::create_dir_all(publish)
            .with_context(|| format!("Creating {}", publish.display()))?;
        for (src, dst) in self.outputs(scratch).iter().zip(self.outputs(publish)) {
            fs::copy(src, &dst)
                .with_context(|| format!("Copying {} to {}", src.display(), dst.display()))?;
            log::debug!("  published {}", dst.display());
        }
        Ok(())
    }
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Removing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))
}

fn failed(profile: &TargetProfile, step: &str, err: &anyhow::Error) -> anyhow::Error {
    XtaskError::PreparationFailed {
        target: profile.name.to_string(),
        step: step.to_string(),
        detail: format!("{err:#}"),
    }
    .into()
}
