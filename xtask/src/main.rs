#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

use clap::Parser;
use std::process::ExitCode;

mod app;
mod build;
mod clean;
mod cli;
mod config;
mod error;
mod prepare;
mod qemu;
mod run;
mod targets;
mod tasks;
#[cfg(test)]
mod testing;
mod toolchain;
mod util;
mod version;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = crate::cli::Cli::parse();
    match crate::app::run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            if let Some(err) = crate::error::find(&e) {
                log::debug!("{err:?}");
            }
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
