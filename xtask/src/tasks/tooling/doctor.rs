use crate::prepare::Preparation;
use crate::targets::{Arch, Registry, TargetProfile};
use crate::toolchain::{HostToolchain, Toolchain};
use crate::version;
use anyhow::{bail, Context, Result};
use std::process::{Command, Output};

/// Check that everything `build`/`run` will spawn is present and new enough.
pub fn run(
    registry: &Registry,
    host: &HostToolchain,
    min_version: &str,
    target: Option<&str>,
) -> Result<()> {
    let profiles: Vec<&TargetProfile> = match target {
        Some(name) => vec![registry.resolve(name)?],
        None => registry.profiles().iter().collect(),
    };

    let mut ok = report("cargo", which::which("cargo").is_ok());

    let installed = match installed_rust_targets() {
        Ok(targets) => Some(targets),
        Err(e) => {
            eprintln!("[FAIL] rustup: {e:#}");
            ok = false;
            None
        }
    };

    let mut seen_triples: Vec<&str> = Vec::new();
    let mut seen_arches: Vec<Arch> = Vec::new();
    for p in &profiles {
        if let Some(installed) = &installed {
            if !seen_triples.contains(&p.triple) {
                seen_triples.push(p.triple);
                let present = installed.iter().any(|t| t == p.triple);
                ok &= report(&format!("rust target {}", p.triple), present);
            }
        }

        if !seen_arches.contains(&p.arch) {
            seen_arches.push(p.arch);
            ok &= check_emulator(host, p, min_version);
        }

        if matches!(p.preparation, Preparation::ExtractAndTranslate(_)) {
            ok &= report(&format!("dtc (needed by {})", p.name), which::which("dtc").is_ok());
        }
    }

    if !ok {
        bail!("doctor checks failed");
    }
    Ok(())
}

fn check_emulator(host: &HostToolchain, profile: &TargetProfile, min_version: &str) -> bool {
    let qemu = host.qemu(profile.emulator());
    let found = if qemu.is_absolute() {
        qemu.is_file()
    } else {
        which::which(&qemu).is_ok()
    };
    if !found {
        return report(&qemu.display().to_string(), false);
    }

    let gate = host.emulator_version(profile).and_then(|out| {
        let actual = version::extract_version(&out)
            .with_context(|| format!("no version in {:?}", out.trim()))?;
        let actual = actual.to_string();
        let meets = version::meets_minimum(min_version, &actual)?;
        Ok((actual, meets))
    });
    match gate {
        Ok((actual, true)) => report(&format!("{} {actual}", qemu.display()), true),
        Ok((actual, false)) => {
            eprintln!(
                "[FAIL] {} {actual} is older than the required {min_version}",
                qemu.display()
            );
            false
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e:#}", qemu.display());
            false
        }
    }
}

fn installed_rust_targets() -> Result<Vec<String>> {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
        .context("Failed to run rustup")?;
    parse_rustup_targets(&output)
}

fn parse_rustup_targets(output: &Output) -> Result<Vec<String>> {
    if !output.status.success() {
        bail!(
            "`rustup target list --installed` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn report(what: &str, ok: bool) -> bool {
    if ok {
        eprintln!("[OK] {what}");
    } else {
        eprintln!("[FAIL] missing {what}");
    }
    ok
}
