//! QEMU command-line assembly

mod builder;

pub use builder::{DisplayMode, QemuBuilder, ResolvedLaunch};
