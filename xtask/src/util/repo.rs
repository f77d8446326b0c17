use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Points xtask at a different checkout
pub const ROOT_ENV: &str = "KAROX_ROOT";

/// `$KAROX_ROOT` when set, otherwise the directory containing `xtask/`.
pub fn repo_root() -> Result<PathBuf> {
    if let Some(root) = env::var_os(ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask is expected at <repo>/xtask")
}

/// An explicit `--config` wins; otherwise `xtask.toml` in the repo root.
pub fn config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => root.join(p),
        None => root.join(crate::config::CONFIG_FILE),
    }
}
