// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod vars;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch as shutdown;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::compile::{resolve_program, Compiler};
use crate::config::{load_or_default, Settings};
use crate::engine::{ChangeQueue, Dispatcher, Runtime, RuntimeOptions};
use crate::errors::Jinja2ConfigError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ChangeKind;
use crate::vars::{
    DisabledEntitySource, EntitySource, GlobalConfig, HttpEntitySource, VariableSnapshot,
    VariableStore,
};
use crate::watch::path_utils::output_path;
use crate::watch::{collect_templates, queue_templates, spawn_watcher, WatchContext};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading and the startup dependency check
/// - the variable store (global config + entity snapshot)
/// - the initial template scan
/// - the compiler, dispatcher and debounce loop
/// - the file watcher
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_or_default(args.settings.as_deref())?;
    let root = resolve_root(&args.root)?;
    check_dependencies(&settings)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.dry_run {
        print_dry_run(fs.as_ref(), &root, &settings)?;
        return Ok(());
    }

    let entities = entity_source(&settings)?;
    let store = Arc::new(VariableStore::new(root.clone(), Arc::clone(&fs), entities));
    store.reload().await;

    // Initial population happens before the watcher starts listening.
    let queue = Arc::new(ChangeQueue::new());
    let snapshot = store.snapshot();
    let queued = queue_templates(
        fs.as_ref(),
        &root,
        settings.template_suffix(),
        &snapshot,
        ChangeKind::InitialCompile,
        &queue,
    )
    .with_context(|| format!("scanning {root:?} for templates"))?;
    info!(
        root = ?root,
        suffix = %settings.template_suffix(),
        templates = queued,
        "compiling templates"
    );

    let compiler = Arc::new(Compiler::new(Arc::clone(&store), &settings));
    let dispatcher = Dispatcher::new(compiler);

    if args.once {
        let report = dispatcher.dispatch(queue.take()).await;
        if !report.is_success() {
            anyhow::bail!(
                "{} template(s) failed to compile: {:?}",
                report.failed.len(),
                report.failed
            );
        }
        return Ok(());
    }

    let watcher = spawn_watcher(WatchContext {
        root: root.clone(),
        template_suffix: settings.template_suffix().to_string(),
        store: Arc::clone(&store),
        fs: Arc::clone(&fs),
        queue: Arc::clone(&queue),
    })?;

    let (shutdown_tx, shutdown_rx) = shutdown::channel(false);
    spawn_signal_listener(shutdown_tx);

    let options = RuntimeOptions {
        poll_interval: settings.poll_interval(),
        quiet_period: settings.debounce(),
    };
    let summary = Runtime::new(queue, dispatcher, options, shutdown_rx).run().await;

    watcher.stop().await;
    info!(
        batches = summary.batches,
        jobs = summary.jobs,
        failed = summary.failed,
        "jinja2config stopped"
    );
    Ok(())
}

/// Canonicalize the root once; it must be an existing directory.
pub fn resolve_root(root: &Path) -> errors::Result<PathBuf> {
    let canonical = root.canonicalize().map_err(|e| {
        Jinja2ConfigError::ConfigError(format!("root directory {root:?} is not accessible: {e}"))
    })?;
    if !canonical.is_dir() {
        return Err(Jinja2ConfigError::ConfigError(format!(
            "root {root:?} is not a directory"
        )));
    }
    Ok(canonical)
}

/// Fail fast when the renderer or formatter cannot be found.
pub fn check_dependencies(settings: &Settings) -> errors::Result<()> {
    for program in [&settings.renderer().program, &settings.formatter().program] {
        match resolve_program(program) {
            Some(path) => debug!(%program, ?path, "found external tool"),
            None => {
                return Err(Jinja2ConfigError::MissingDependency(format!(
                    "{program} was not found ({})",
                    install_hint(program)
                )));
            }
        }
    }
    Ok(())
}

fn install_hint(program: &str) -> &'static str {
    match program {
        "jinja" => "install jinja-cli: pip install jinja-cli",
        "prettier" => "install Prettier: npm install -g prettier",
        _ => "install it or point the settings file at it",
    }
}

fn entity_source(settings: &Settings) -> errors::Result<Arc<dyn EntitySource>> {
    if settings.entities().enabled {
        Ok(Arc::new(HttpEntitySource::from_settings(settings.entities())?))
    } else {
        info!("entity snapshot disabled");
        Ok(Arc::new(DisabledEntitySource))
    }
}

/// List templates, their outputs and skip status. Nothing is compiled and
/// no network request is made.
fn print_dry_run(fs: &dyn FileSystem, root: &Path, settings: &Settings) -> Result<()> {
    let config = GlobalConfig::load_or_empty(fs, &root.join(vars::GLOBAL_CONFIG_FILE));
    let snapshot = VariableSnapshot::from_parts(root, config, None);
    let templates = collect_templates(fs, root, settings.template_suffix())?;

    println!("jinja2config dry-run");
    println!("  root = {}", root.display());
    println!(
        "  renderer = {} {}",
        settings.renderer().program,
        settings.renderer().args.join(" ")
    );
    println!(
        "  formatter = {} {}",
        settings.formatter().program,
        settings.formatter().args.join(" ")
    );
    println!();

    println!("templates ({}):", templates.len());
    for path in &templates {
        let rel = path.strip_prefix(root).unwrap_or(path);
        if snapshot.is_skipped(path) {
            println!("  - {} (skipped)", rel.display());
            continue;
        }
        match output_path(path, settings.template_extension()) {
            Some(out) => println!(
                "  - {} -> {}",
                rel.display(),
                out.strip_prefix(root).unwrap_or(&out).display()
            ),
            None => println!("  - {} (no output path)", rel.display()),
        }
    }

    debug!("dry-run complete (no compilation)");
    Ok(())
}

fn spawn_signal_listener(tx: shutdown::Sender<bool>) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown requested; finishing in-flight batch");
        let _ = tx.send(true);
    });
}

/// Resolves on Ctrl-C (or SIGTERM on unix). Never resolves if no signal
/// could be registered, so the loop is not stopped by accident.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                None
            }
        };

        let sigterm = async {
            match term.as_mut() {
                Some(s) => {
                    s.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = ctrl_c() => {}
            _ = sigterm => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
