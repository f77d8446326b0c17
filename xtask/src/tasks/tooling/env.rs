use crate::build::Layout;
use crate::targets::Registry;
use crate::toolchain::RUNTIME_DIR_ENV;
use anyhow::Result;
use std::path::Path;

/// Print the exports a hand-run `cargo build` of the kernel needs.
///
/// Usage:
///   eval "$(cargo xtask env loongarch64)"
pub fn run(
    registry: &Registry,
    layout: &Layout,
    qemu_prefix: Option<&Path>,
    target: &str,
    shell: crate::cli::Shell,
) -> Result<()> {
    let profile = registry.resolve(target)?;
    for line in exports(layout, qemu_prefix, profile.name, shell) {
        println!("{line}");
    }
    Ok(())
}

fn exports(
    layout: &Layout,
    qemu_prefix: Option<&Path>,
    target: &str,
    shell: crate::cli::Shell,
) -> Vec<String> {
    let mut lines = Vec::new();
    match shell {
        crate::cli::Shell::Bash | crate::cli::Shell::Sh => {
            lines.push(format!(
                "export {RUNTIME_DIR_ENV}=\"{}\"",
                layout.target_runtime(target).display()
            ));
            if let Some(prefix) = qemu_prefix {
                lines.push(format!("export PATH=\"{}:$PATH\"", prefix.display()));
            }
        }
        crate::cli::Shell::Fish => {
            lines.push(format!(
                "set -gx {RUNTIME_DIR_ENV} \"{}\"",
                layout.target_runtime(target).display()
            ));
            if let Some(prefix) = qemu_prefix {
                lines.push(format!("fish_add_path --path \"{}\"", prefix.display()));
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Shell;

    #[test]
    fn test_bash_exports() {
        let layout = Layout::new(Path::new("/repo"), Path::new("runtime"));
        let lines = exports(&layout, Some(Path::new("/opt/qemu/bin")), "loongarch64", Shell::Bash);
        assert_eq!(
            lines,
            [
                "export KAROX_RUNTIME_DIR=\"/repo/runtime/loongarch64\"",
                "export PATH=\"/opt/qemu/bin:$PATH\"",
            ]
        );
    }

    #[test]
    fn test_fish_without_prefix() {
        let layout = Layout::new(Path::new("/repo"), Path::new("runtime"));
        let lines = exports(&layout, None, "riscv64", Shell::Fish);
        assert_eq!(lines, ["set -gx KAROX_RUNTIME_DIR \"/repo/runtime/riscv64\""]);
    }
}
