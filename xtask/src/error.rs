//! Error taxonomy for the build/run pipeline.
//!
//! Everything is fatal to the current invocation. Errors travel inside
//! `anyhow::Error` and are downcast in `main` for reporting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XtaskError {
    #[error("unknown target '{name}' (known targets: {known})")]
    UnknownTarget { name: String, known: String },

    #[error("malformed version '{version}': {reason}")]
    MalformedVersion { version: String, reason: String },

    #[error("preparation failed for {target} during {step}: {detail}")]
    PreparationFailed {
        target: String,
        step: String,
        detail: String,
    },

    #[error("compiling {artifact} for {target} failed: {detail}")]
    CompileFailed {
        target: String,
        artifact: String,
        detail: String,
    },

    #[error("could not determine the version of {emulator} from its output: {output:?}")]
    VersionQueryFailed { emulator: String, output: String },

    #[error(
        "{emulator} {actual} is too old: version {required} or newer is required.\n\
         Install a newer QEMU or point `qemu.prefix` in xtask.toml at one."
    )]
    UnsupportedEmulatorVersion {
        emulator: String,
        required: String,
        actual: String,
    },

    #[error("target '{0}' is declared more than once")]
    DuplicateTarget(String),

    #[error("default target '{0}' is not a declared target")]
    UnknownDefaultTarget(String),

    #[error("output template '{0}' must contain both {{mode}} and {{target}}")]
    InvalidOutputTemplate(String),
}

/// Finds an [`XtaskError`] anywhere in an error chain.
pub fn find(err: &anyhow::Error) -> Option<&XtaskError> {
    err.chain().find_map(|e| e.downcast_ref::<XtaskError>())
}
