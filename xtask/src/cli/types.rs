use crate::qemu::DisplayMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build the Karox kernel and boot it under QEMU")]
pub struct Cli {
    /// Config file (default: xtask.toml in the repo root)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Build user-space, prepare, and build the kernel.
    Build {
        /// Target to build (default: the configured default target)
        target: Option<String>,

        /// Build every known target, stopping at the first failure.
        #[arg(long, conflicts_with = "target")]
        all: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Build, then boot the kernel under QEMU.
    Run {
        target: Option<String>,

        #[command(flatten)]
        mode: ModeArgs,

        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Boot the last build without rebuilding.
    #[command(name = "run-only")]
    RunOnly {
        target: Option<String>,

        #[command(flatten)]
        mode: ModeArgs,

        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Remove staged runtime files and built kernel images.
    Clean {
        /// Only clean this target
        target: Option<String>,
    },

    /// List known targets.
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check that cargo, rust targets, QEMU and dtc are available.
    Doctor {
        target: Option<String>,
    },

    /// Print the environment a manual kernel build needs.
    ///
    /// Usage:
    ///   eval "$(cargo xtask env loongarch64)"
    Env {
        target: Option<String>,

        #[arg(long, value_enum, default_value_t = Shell::Bash)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Copy, Debug)]
pub struct ModeArgs {
    /// Build without optimisations (overrides the config file)
    #[arg(long)]
    pub debug: bool,

    /// Build with optimisations (overrides the config file)
    #[arg(long, conflicts_with = "debug")]
    pub release: bool,
}

#[derive(Args, Clone, Copy, Debug)]
pub struct LaunchArgs {
    #[arg(long, value_enum, default_value_t = DisplayMode::Nographic)]
    pub display: DisplayMode,

    /// Start a GDB server on tcp::1234
    #[arg(long)]
    pub gdb: bool,

    /// Like --gdb, and freeze the CPU until a debugger attaches
    #[arg(long)]
    pub gdb_wait: bool,

    /// Print the QEMU command line instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Shell {
    Bash,
    Sh,
    Fish,
}
