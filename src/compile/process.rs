// src/compile/process.rs

//! Running the external renderer and formatter.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{Jinja2ConfigError, Result};

/// A program plus argument template.
///
/// Arguments may contain placeholders such as `{template}`; they are
/// substituted per invocation by [`CommandSpec::resolve_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Replace every `placeholder` occurrence with the matching path.
    pub fn resolve_args(&self, substitutions: &[(&str, &Path)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (placeholder, path)| {
                        acc.replace(*placeholder, &path.to_string_lossy())
                    })
            })
            .collect()
    }
}

/// Captured result of one external process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `spec` to completion, capturing stdout and stderr.
///
/// With `timeout` set, a process that outlives it is killed and an error is
/// returned. Without it the call waits for as long as the process runs.
pub async fn run_command(
    spec: &CommandSpec,
    substitutions: &[(&str, &Path)],
    timeout: Option<Duration>,
) -> Result<ProcessOutput> {
    let args = spec.resolve_args(substitutions);
    debug!(program = %spec.program, ?args, "starting process");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
        Jinja2ConfigError::ProcessError(format!("spawning {:?}: {e}", spec.program))
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let wait = child.wait_with_output();
    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(res) => res,
            Err(_) => {
                warn!(program = %spec.program, ?limit, "process timed out; killed");
                return Err(Jinja2ConfigError::ProcessError(format!(
                    "{:?} did not finish within {limit:?}",
                    spec.program
                )));
            }
        },
        None => wait.await,
    }
    .map_err(|e| Jinja2ConfigError::ProcessError(format!("waiting for {:?}: {e}", spec.program)))?;

    let result = ProcessOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: output.stdout,
        stderr: output.stderr,
    };

    debug!(
        program = %spec.program,
        exit_code = ?result.exit_code,
        success = result.success,
        "process exited"
    );

    Ok(result)
}

/// Locate `program` the way a shell would: paths with a separator are checked
/// directly, bare names are searched on `PATH`.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| executable_candidates(&dir, program))
        .find(|p| p.is_file())
}

#[cfg(windows)]
fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    ["", ".exe", ".cmd", ".bat"]
        .iter()
        .map(|ext| dir.join(format!("{program}{ext}")))
        .collect()
}

#[cfg(not(windows))]
fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders_inside_arguments() {
        let spec = CommandSpec::new("jinja", ["-d", "{context}", "--src={template}"]);
        let args = spec.resolve_args(&[
            ("{template}", Path::new("/config/a.yaml.jinja")),
            ("{context}", Path::new("/tmp/ctx.json")),
        ]);
        assert_eq!(args, vec!["-d", "/tmp/ctx.json", "--src=/config/a.yaml.jinja"]);
    }

    #[cfg(unix)]
    #[test]
    fn resolves_programs_on_path() {
        assert!(resolve_program("sh").is_some());
        assert!(resolve_program("definitely-not-a-real-program-xyz").is_none());
        assert!(resolve_program("/definitely/not/here").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let spec = CommandSpec::new("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        let out = run_command(&spec, &[], None).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(String::from_utf8_lossy(&out.stdout), "out\n");
        assert_eq!(out.stderr_lossy(), "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_the_process() {
        let spec = CommandSpec::new("sleep", ["5"]);
        let res = run_command(&spec, &[], Some(Duration::from_millis(100))).await;
        assert!(matches!(res, Err(Jinja2ConfigError::ProcessError(_))));
    }
}
