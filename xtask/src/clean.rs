use crate::build::{BuildConfig, BuildMode, Layout};
use crate::prepare::Preparation;
use crate::targets::Registry;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Remove staged runtime files and built kernel images, for one target or all.
pub fn clean(
    registry: &Registry,
    layout: &Layout,
    output_template: &str,
    target: Option<&str>,
) -> Result<()> {
    let profiles = match target {
        Some(name) => vec![registry.resolve(name)?],
        None => registry.profiles().iter().collect(),
    };

    let names: Vec<&str> = profiles.iter().map(|p| p.name).collect();
    log::info!("Cleaning {}", names.join(", "));

    if target.is_none() {
        remove(&layout.runtime_dir)?;
    }
    for profile in profiles {
        remove(&layout.target_runtime(profile.name))?;
        if let Preparation::ExtractAndTranslate(ex) = profile.preparation {
            for published in ex.outputs(layout.publish_dir()) {
                remove(&published)?;
            }
        }
        for mode in [BuildMode::Release, BuildMode::Debug] {
            let config = BuildConfig::new(profile.name, mode, output_template)?;
            remove(&layout.kernel_image(&config))?;
        }
    }
    Ok(())
}

fn remove(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("Removing {}", path.display()))?;
    } else if path.exists() {
        fs::remove_file(path).with_context(|| format!("Removing {}", path.display()))?;
    } else {
        return Ok(());
    }
    log::debug!("removed {}", path.display());
    Ok(())
}
