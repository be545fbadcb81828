// src/compile/compiler.rs

//! Template compilation: render, stamp, format, write.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::compile::process::{run_command, CommandSpec, ProcessOutput};
use crate::config::model::{CONTEXT_PLACEHOLDER, FILE_PLACEHOLDER, TEMPLATE_PLACEHOLDER};
use crate::config::Settings;
use crate::engine::{JobFuture, JobOutcome, JobRunner};
use crate::errors::{Jinja2ConfigError, Result};
use crate::types::ChangeEvent;
use crate::vars::{VariableContext, VariableStore};
use crate::watch::path_utils::{error_log_path, output_path};

/// First line of every generated file; the template file name follows.
pub const GENERATED_HEADER_PREFIX: &str = "# DO NOT EDIT: Generated from: ";

/// Which external step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Render,
    Format,
    /// Scratch files or the final rename.
    Io,
}

/// Result of [`Compiler::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Written { output: PathBuf },
    Skipped,
    /// The error log holds the diagnostics; any previous output was removed.
    Failed {
        stage: FailedStage,
        exit_code: Option<i32>,
        error_log: PathBuf,
    },
}

/// Result of [`Compiler::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    AlreadyAbsent,
    Failed,
}

/// Compiles templates through the external renderer and formatter.
#[derive(Debug)]
pub struct Compiler {
    store: Arc<VariableStore>,
    template_extension: String,
    renderer: CommandSpec,
    formatter: CommandSpec,
    strict_formatter: bool,
    timeout: Option<Duration>,
}

impl Compiler {
    pub fn new(store: Arc<VariableStore>, settings: &Settings) -> Self {
        Self {
            store,
            template_extension: settings.template_extension().to_string(),
            renderer: CommandSpec::new(
                settings.renderer().program.clone(),
                settings.renderer().args.clone(),
            ),
            formatter: CommandSpec::new(
                settings.formatter().program.clone(),
                settings.formatter().args.clone(),
            ),
            strict_formatter: settings.formatter().strict,
            timeout: settings.process_timeout(),
        }
    }

    /// Output path for a template.
    ///
    /// A path without the template extension is a caller error: compiling it
    /// would overwrite the template with its own output.
    pub fn output_path_for(&self, path: &Path) -> Result<PathBuf> {
        output_path(path, &self.template_extension).ok_or_else(|| Jinja2ConfigError::NotATemplate {
            path: path.to_path_buf(),
            suffix: self.template_extension.clone(),
        })
    }

    /// Compile one template.
    ///
    /// Renderer (and, in strict mode, formatter) failures, including spawn
    /// errors and timeouts, are reported as [`CompileOutcome::Failed`], as is
    /// IO on scratch files and the output. `Err` means a non-template path.
    pub async fn compile(&self, path: &Path) -> Result<CompileOutcome> {
        let snapshot = self.store.snapshot();
        if snapshot.is_skipped(path) {
            info!(?path, "template is in the skip list; not compiling");
            return Ok(CompileOutcome::Skipped);
        }

        let output = self.output_path_for(path)?;
        let error_log = error_log_path(path);
        info!(?path, ?output, "compiling template");

        let context = snapshot.context_for(path);
        let context_file = match write_context_file(&context) {
            Ok(file) => file,
            Err(err) => {
                let message = format!("failed to write variable context: {err}");
                return Ok(self.io_failure(path, &output, error_log, &message).await);
            }
        };

        let rendered = run_command(
            &self.renderer,
            &[
                (TEMPLATE_PLACEHOLDER, path),
                (CONTEXT_PLACEHOLDER, context_file.path()),
            ],
            self.timeout,
        )
        .await;
        drop(context_file);

        let rendered = match rendered {
            Ok(out) if out.success => out,
            Ok(out) => {
                self.record_failure(path, &output, &error_log, &out.stderr).await;
                return Ok(CompileOutcome::Failed {
                    stage: FailedStage::Render,
                    exit_code: out.exit_code,
                    error_log,
                });
            }
            // Spawn failures and timeouts: the message stands in for stderr.
            Err(err) => {
                self.record_failure(path, &output, &error_log, err.to_string().as_bytes())
                    .await;
                return Ok(CompileOutcome::Failed {
                    stage: FailedStage::Render,
                    exit_code: None,
                    error_log,
                });
            }
        };

        let scratch = match stage_output(path, &output, &rendered.stdout) {
            Ok(file) => file,
            Err(err) => {
                let message = format!("failed to stage output for {output:?}: {err}");
                return Ok(self.io_failure(path, &output, error_log, &message).await);
            }
        };

        let formatted = run_command(&self.formatter, &[(FILE_PLACEHOLDER, scratch.path())], self.timeout).await;
        if let Some(diagnostics) = formatter_failure(formatted) {
            if self.strict_formatter {
                self.record_failure(path, &output, &error_log, diagnostics.stderr.as_bytes())
                    .await;
                return Ok(CompileOutcome::Failed {
                    stage: FailedStage::Format,
                    exit_code: diagnostics.exit_code,
                    error_log,
                });
            }
            warn!(
                ?path,
                exit_code = ?diagnostics.exit_code,
                stderr = %diagnostics.stderr,
                "formatter failed; writing unformatted output"
            );
        }

        if let Err(err) = scratch.persist(&output) {
            let message = format!("failed to write {output:?}: {}", err.error);
            return Ok(self.io_failure(path, &output, error_log, &message).await);
        }
        remove_if_exists(&error_log).await;

        info!(?path, ?output, "template compiled");
        Ok(CompileOutcome::Written { output })
    }

    /// Delete the generated output of a removed template.
    ///
    /// Best-effort: every failure is logged and folded into the outcome.
    pub async fn remove(&self, path: &Path) -> RemoveOutcome {
        let output = match self.output_path_for(path) {
            Ok(output) => output,
            Err(err) => {
                warn!(?path, error = %err, "cannot derive output path; nothing removed");
                return RemoveOutcome::Failed;
            }
        };

        info!(?path, ?output, "template deleted; removing output");
        match tokio::fs::remove_file(&output).await {
            Ok(()) => RemoveOutcome::Removed,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(?output, "output already absent");
                RemoveOutcome::AlreadyAbsent
            }
            Err(err) => {
                warn!(?output, error = %err, "failed to remove output");
                RemoveOutcome::Failed
            }
        }
    }

    async fn io_failure(
        &self,
        path: &Path,
        output: &Path,
        error_log: PathBuf,
        message: &str,
    ) -> CompileOutcome {
        self.record_failure(path, output, &error_log, message.as_bytes())
            .await;
        CompileOutcome::Failed {
            stage: FailedStage::Io,
            exit_code: None,
            error_log,
        }
    }

    async fn record_failure(&self, path: &Path, output: &Path, error_log: &Path, stderr: &[u8]) {
        match tokio::fs::remove_file(output).await {
            Ok(()) => info!(?output, "removed stale output after failed compile"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(?output, error = %err, "failed to remove stale output"),
        }

        if let Err(err) = tokio::fs::write(error_log, stderr).await {
            warn!(?error_log, error = %err, "failed to write error log");
        }

        error!(
            ?path,
            ?error_log,
            "error compiling template:\n{}",
            String::from_utf8_lossy(stderr)
        );
    }
}

impl JobRunner for Compiler {
    fn run_job<'a>(&'a self, change: &'a ChangeEvent) -> JobFuture<'a> {
        Box::pin(async move {
            if change.kind.is_removal() {
                return match self.remove(&change.path).await {
                    RemoveOutcome::Removed | RemoveOutcome::AlreadyAbsent => JobOutcome::Removed,
                    RemoveOutcome::Failed => JobOutcome::Failed,
                };
            }

            match self.compile(&change.path).await {
                Ok(CompileOutcome::Written { .. }) => JobOutcome::Compiled,
                Ok(CompileOutcome::Skipped) => JobOutcome::Skipped,
                Ok(CompileOutcome::Failed { .. }) => JobOutcome::Failed,
                Err(err) => {
                    error!(path = ?change.path, kind = %change.kind, error = %err, "compile job error");
                    JobOutcome::Failed
                }
            }
        })
    }
}

/// Header line naming the source template.
pub fn generated_header(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{GENERATED_HEADER_PREFIX}{name}\n")
}

fn write_context_file(context: &VariableContext) -> io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("jinja2config-context-")
        .suffix(".json")
        .tempfile()?;
    serde_json::to_writer(&mut file, context)?;
    file.flush()?;
    Ok(file)
}

/// Scratch file next to `output`, so the final rename stays on one
/// filesystem. It keeps the output's extension for the formatter's parser
/// detection.
fn scratch_file_for(output: &Path) -> io::Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let suffix = output
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix(".jinja2config-").suffix(&suffix);
    // Generated files are read by other processes; not the 0600 default.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}

/// Header plus rendered body in a scratch file beside `output`.
fn stage_output(template: &Path, output: &Path, body: &[u8]) -> io::Result<NamedTempFile> {
    let mut scratch = scratch_file_for(output)?;
    scratch.write_all(generated_header(template).as_bytes())?;
    scratch.write_all(body)?;
    scratch.flush()?;
    Ok(scratch)
}

struct FormatterDiagnostics {
    exit_code: Option<i32>,
    stderr: String,
}

fn formatter_failure(result: Result<ProcessOutput>) -> Option<FormatterDiagnostics> {
    match result {
        Ok(out) if out.success => None,
        Ok(out) => Some(FormatterDiagnostics {
            exit_code: out.exit_code,
            stderr: out.stderr_lossy(),
        }),
        Err(err) => Some(FormatterDiagnostics {
            exit_code: None,
            stderr: err.to_string(),
        }),
    }
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(?path, "removed stale error log"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(?path, error = %err, "failed to remove stale error log"),
    }
}
