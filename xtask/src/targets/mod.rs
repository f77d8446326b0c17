mod profile;
mod registry;

pub use profile::{Arch, Firmware, TargetProfile};
pub use registry::Registry;
