//! Configuration file support for xtask
//!
//! Reads xtask.toml from the repo root. Every field is optional; a missing
//! file means defaults throughout.

use crate::build::{BuildMode, DEFAULT_OUTPUT_TEMPLATE};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "xtask.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XtaskConfig {
    /// Overrides the registry's default target
    #[serde(default)]
    pub default_target: Option<String>,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub qemu: QemuSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    #[serde(default)]
    pub mode: BuildMode,

    #[serde(default = "default_output_template")]
    pub output_template: String,

    #[serde(default = "default_kernel_dir")]
    pub kernel_dir: PathBuf,

    #[serde(default = "default_kernel_bin")]
    pub kernel_bin: String,

    #[serde(default = "default_user_dir")]
    pub user_dir: PathBuf,
}

impl Default for BuildSection {
    fn default() -> Self {
        BuildSection {
            mode: BuildMode::default(),
            output_template: default_output_template(),
            kernel_dir: default_kernel_dir(),
            kernel_bin: default_kernel_bin(),
            user_dir: default_user_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        PathsSection {
            runtime_dir: default_runtime_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QemuSection {
    #[serde(default = "default_min_version")]
    pub min_version: String,

    /// Directory holding qemu-system-* binaries; PATH lookup when unset
    #[serde(default)]
    pub prefix: Option<PathBuf>,
}

impl Default for QemuSection {
    fn default() -> Self {
        QemuSection {
            min_version: default_min_version(),
            prefix: None,
        }
    }
}

fn default_output_template() -> String {
    DEFAULT_OUTPUT_TEMPLATE.to_string()
}
fn default_kernel_dir() -> PathBuf {
    PathBuf::from("os")
}
fn default_kernel_bin() -> String {
    "os".to_string()
}
fn default_user_dir() -> PathBuf {
    PathBuf::from("user")
}
fn default_runtime_dir() -> PathBuf {
    PathBuf::from("runtime")
}
fn default_min_version() -> String {
    "9.0.50".to_string()
}

impl XtaskConfig {
    /// Load config from `path` (or use defaults if the file doesn't exist)
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("{} not found, using defaults", path.display());
            return Ok(XtaskConfig::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = XtaskConfig::load(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.default_target, None);
        assert_eq!(config.build.mode, BuildMode::Release);
        assert_eq!(config.build.output_template, DEFAULT_OUTPUT_TEMPLATE);
        assert_eq!(config.build.kernel_dir, PathBuf::from("os"));
        assert_eq!(config.build.kernel_bin, "os");
        assert_eq!(config.paths.runtime_dir, PathBuf::from("runtime"));
        assert_eq!(config.qemu.min_version, "9.0.50");
        assert!(config.qemu.prefix.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = XtaskConfig::parse(
            r#"
            default_target = "loongarch64"

            [build]
            mode = "debug"

            [qemu]
            prefix = "/opt/qemu/bin"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_target.as_deref(), Some("loongarch64"));
        assert_eq!(config.build.mode, BuildMode::Debug);
        assert_eq!(config.build.user_dir, PathBuf::from("user"));
        assert_eq!(config.qemu.min_version, "9.0.50");
        assert_eq!(config.qemu.prefix, Some(PathBuf::from("/opt/qemu/bin")));
    }

    #[test]
    fn test_load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[qemu]\nmin_version = \"8.2\"\n").unwrap();
        assert_eq!(XtaskConfig::load(&path).unwrap().qemu.min_version, "8.2");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(XtaskConfig::parse("[qemu]\nminimum = \"9.0\"\n").is_err());
        assert!(XtaskConfig::parse("[build]\nmode = \"fast\"\n").is_err());
    }
}
