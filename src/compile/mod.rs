// src/compile/mod.rs

//! Turning templates into generated files.
//!
//! - [`process`] runs the external renderer/formatter with
//!   `tokio::process::Command` and captures their output.
//! - [`compiler`] owns the per-template workflow: skip check, context
//!   resolution, render, header, format, atomic write, error log handling.
//!   [`Compiler`] is the production [`crate::engine::JobRunner`].

pub mod compiler;
pub mod process;

pub use compiler::{
    generated_header, CompileOutcome, Compiler, FailedStage, RemoveOutcome, GENERATED_HEADER_PREFIX,
};
pub use process::{resolve_program, run_command, CommandSpec, ProcessOutput};
