// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod reload;
pub mod rules;
pub mod scheduler;
pub mod session;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, project_root, ConfigFile};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::reload::{serve, LiveReload, NoopReload, ReloadSignal, ServeOptions};
use crate::rules::{ChainTable, TaskRegistry};
use crate::scheduler::Scheduler;
use crate::session::{Orchestrator, RUNTIME_CHANNEL_CAPACITY};
use crate::transform::TransformContext;
use crate::watch::NotifyWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and registry validation
/// - scheduler / runtime / executor
/// - (optional) preview server and file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = project_root(&config_path, &cfg);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let registry = Arc::new(TaskRegistry::from_config(&cfg, fs.as_ref(), &root)?);
    let chains = ChainTable::with_overrides(&registry, cfg.chain_overrides())?;

    if args.dry_run {
        print_dry_run(&cfg, &root, &registry, &chains);
        return Ok(());
    }

    let ctx = TransformContext::new(root.clone(), fs);

    if args.once {
        return run_once(registry, chains, ctx).await;
    }

    let server_cfg = cfg.server_section();
    let live = LiveReload::new();
    let server = if server_cfg.enabled && !args.no_serve {
        let opts = ServeOptions {
            host: server_cfg.host.clone(),
            port: args.port.unwrap_or(server_cfg.port),
            base_dir: root.join(&server_cfg.base_dir),
        };
        Some(serve(&opts, live.clone()).await?)
    } else {
        None
    };
    let reload: Arc<dyn ReloadSignal> = if server.is_some() {
        Arc::new(live)
    } else {
        Arc::new(NoopReload)
    };

    let section = cfg.config_section();
    let notifier = NotifyWatcher::new(Duration::from_millis(section.debounce_ms));
    let session = Orchestrator::new(Arc::clone(&registry), chains, root, notifier)
        .with_reload(reload)
        .with_server(server)
        .initial_build(section.initial_build)
        .start(move |tx| RealExecutorBackend::new(registry, ctx, tx))
        .await?;

    if let Some(addr) = session.server_addr() {
        info!("serving on http://{addr}");
    }

    let summary = session.wait_for_ctrl_c().await?;
    info!(
        bursts = summary.bursts,
        task_runs = summary.task_runs,
        task_failures = summary.task_failures,
        "session ended"
    );
    Ok(())
}

/// Build every task once and exit; any task failure is an error.
async fn run_once(
    registry: Arc<TaskRegistry>,
    chains: ChainTable,
    ctx: TransformContext,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(RUNTIME_CHANNEL_CAPACITY);
    let executor = RealExecutorBackend::new(Arc::clone(&registry), ctx, tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    tx.send(RuntimeEvent::InitialBuildRequested).await?;

    let core = CoreRuntime::new(
        Scheduler::new(registry, chains),
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let summary = Runtime::new(core, rx, executor, Arc::new(NoopReload))
        .run()
        .await?;

    if summary.task_failures > 0 {
        bail!(
            "{} of {} task run(s) failed",
            summary.task_failures,
            summary.task_runs
        );
    }
    info!(tasks = summary.task_runs, "build complete");
    Ok(())
}

/// Dry-run output: rules, transforms and chains.
fn print_dry_run(cfg: &ConfigFile, root: &Path, registry: &TaskRegistry, chains: &ChainTable) {
    println!("assetwatch dry-run");
    println!("  root = {}", root.display());
    println!("  config.debounce_ms = {}", cfg.config_section().debounce_ms);
    println!("  config.initial_build = {}", cfg.config_section().initial_build);
    let server = cfg.server_section();
    println!(
        "  server = {} (http://{}:{}, serving {})",
        if server.enabled { "enabled" } else { "disabled" },
        server.host,
        server.port,
        server.base_dir.display()
    );
    println!();

    println!("rules ({}):", registry.len());
    for task in registry.all() {
        let rule = task.rule();
        println!("  - {} [{}]", task.id(), rule.category());
        println!("      transform: {}", task.transform().kind());
        if let Some(cmd) = cfg.rules().get(task.id()).and_then(|r| r.cmd.as_deref()) {
            println!("      cmd: {cmd}");
        }
        println!("      src: {:?}", rule.source_patterns());
        if rule.watch_patterns().iter().map(String::as_str).ne(rule.source_patterns()) {
            println!("      watch: {:?}", rule.watch_patterns());
        }
        println!("      dest: {}", rule.dest().display());
    }
    println!();

    println!("chains:");
    for task in registry.all() {
        let category = task.rule().category();
        if let Some(chain) = chains.get(category) {
            println!("  {category}: {}", chain.join(" -> "));
        }
    }

    debug!("dry-run complete (no execution)");
}
