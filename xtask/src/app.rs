use crate::build::{BuildConfig, BuildMode, Layout, Orchestrator};
use crate::cli::{Cli, Cmd, LaunchArgs, ModeArgs};
use crate::config::XtaskConfig;
use crate::prepare::Preparation;
use crate::run::{LaunchAssembler, LaunchOptions};
use crate::targets::Registry;
use crate::toolchain::HostToolchain;
use anyhow::Result;

/// Dispatch a parsed command line. The returned code becomes the process
/// exit status; for `run`/`run-only` it is QEMU's own.
pub fn run(cli: Cli) -> Result<i32> {
    let root = crate::util::repo::repo_root()?;
    let config = XtaskConfig::load(&crate::util::repo::config_path(&root, cli.config.as_deref()))?;
    let registry = Registry::builtin()?;
    let layout = Layout::new(&root, &config.paths.runtime_dir);
    let host = HostToolchain {
        root: root.clone(),
        kernel_dir: config.build.kernel_dir.clone(),
        kernel_bin: config.build.kernel_bin.clone(),
        user_dir: config.build.user_dir.clone(),
        qemu_prefix: config.qemu.prefix.clone(),
    };

    let default_target = match config.default_target.as_deref() {
        Some(name) => registry.resolve(name)?.name,
        None => registry.default_target(),
    };
    let template = config.build.output_template.as_str();

    log::debug!("repo: {}", root.display());

    match cli.cmd {
        Cmd::Build { target, all, mode } => {
            let orch = Orchestrator::new(&registry, &layout, &host);
            let mode = build_mode(mode, config.build.mode);
            if all {
                let images = orch.build_all(mode, template)?;
                log::info!("Built {} target(s)", images.len());
            } else {
                let target = target.as_deref().unwrap_or(default_target);
                orch.build(&BuildConfig::new(target, mode, template)?)?;
            }
            Ok(0)
        }
        Cmd::Run { target, mode, launch } => {
            let target = target.as_deref().unwrap_or(default_target);
            let build = BuildConfig::new(target, build_mode(mode, config.build.mode), template)?;
            let assembler = LaunchAssembler::new(
                Orchestrator::new(&registry, &layout, &host),
                &config.qemu.min_version,
                launch_options(launch),
            );
            assembler.run(&build)
        }
        Cmd::RunOnly { target, mode, launch } => {
            let target = target.as_deref().unwrap_or(default_target);
            let build = BuildConfig::new(target, build_mode(mode, config.build.mode), template)?;
            let assembler = LaunchAssembler::new(
                Orchestrator::new(&registry, &layout, &host),
                &config.qemu.min_version,
                launch_options(launch),
            );
            assembler.run_only(&build)
        }
        Cmd::Clean { target } => {
            crate::clean::clean(&registry, &layout, template, target.as_deref())?;
            Ok(0)
        }
        Cmd::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(registry.profiles())?);
            } else {
                for line in list_lines(&registry, default_target) {
                    println!("{line}");
                }
            }
            Ok(0)
        }
        Cmd::Doctor { target } => {
            crate::tasks::tooling::doctor::run(
                &registry,
                &host,
                &config.qemu.min_version,
                target.as_deref(),
            )?;
            Ok(0)
        }
        Cmd::Env { target, shell } => {
            crate::tasks::tooling::env::run(
                &registry,
                &layout,
                config.qemu.prefix.as_deref(),
                target.as_deref().unwrap_or(default_target),
                shell,
            )?;
            Ok(0)
        }
    }
}

fn build_mode(args: ModeArgs, configured: BuildMode) -> BuildMode {
    if args.debug {
        BuildMode::Debug
    } else if args.release {
        BuildMode::Release
    } else {
        configured
    }
}

fn launch_options(args: LaunchArgs) -> LaunchOptions {
    LaunchOptions {
        display: args.display,
        gdb: args.gdb,
        gdb_wait: args.gdb_wait,
        dry_run: args.dry_run,
    }
}

fn list_lines(registry: &Registry, default_target: &str) -> Vec<String> {
    registry
        .profiles()
        .iter()
        .map(|p| {
            let prep = match p.preparation {
                Preparation::NoOp => "-",
                Preparation::ExtractAndTranslate(_) => "device-tree",
            };
            let marker = if p.name == default_target { "*" } else { " " };
            format!(
                "{marker} {:<12} {:<12} {:<28} {:<6} {:>6} x{:<3} {prep}",
                p.name,
                p.arch.name(),
                p.triple,
                p.machine,
                p.memory(),
                p.cpus,
            )
        })
        .collect()
}
