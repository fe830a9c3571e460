// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_builtin};
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, Trigger};
use crate::exec::RealExecutorBackend;
use crate::fs::RealFileSystem;
use crate::pipeline::{Pipeline, Target};
use crate::server::{DevServer, ServerSettings};
use crate::tasks::{ProjectPaths, TaskContext};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and path resolution
/// - scheduler / queue / runtime
/// - dev server and executor
/// - Ctrl-C handling
///
/// Returns the process exit code: `0` when every run succeeded, `1` when
/// a task failed.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_builtin(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;
    let paths = ProjectPaths::resolve(project_root(&config_path)?, &cfg);

    let flow = Pipeline::default_flow();
    flow.validate()?;

    if args.dry_run {
        print_dry_run(&cfg, &paths, args.target)?;
        return Ok(0);
    }

    let scheduler = Scheduler::from_pipeline(&flow);
    let behaviour = cfg.config.triggered_while_running_behaviour;
    let queue_length = cfg.config.queue_length;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let server = Arc::new(DevServer::new(ServerSettings::from_config(
        &cfg,
        paths.build.clone(),
    )));
    let ctx = Arc::new(TaskContext::new(
        cfg,
        paths,
        Arc::new(RealFileSystem),
        Arc::clone(&server),
        rt_tx.clone(),
    ));
    let executor = RealExecutorBackend::new(Arc::clone(&ctx), rt_tx.clone());

    // First Ctrl-C → graceful shutdown, second one → exit immediately.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("second Ctrl+C, exiting without cleanup");
                std::process::exit(130);
            }
        });
    }

    let tasks = args.target.tasks();
    info!(target = ?args.target, ?tasks, "starting");
    rt_tx
        .send(RuntimeEvent::Triggered(Trigger::manual(tasks)))
        .await
        .context("seeding initial trigger")?;

    let options = RuntimeOptions {
        exit_when_idle: !args.target.keeps_process_alive(),
    };
    let core = CoreRuntime::new(scheduler, behaviour, queue_length, options);
    let runtime = Runtime::new(core, rt_rx, executor).with_server(Arc::clone(&server));

    let result = runtime.run().await;

    ctx.stop_watching();
    server.stop().await;

    let report = result?;
    if report.is_success() {
        Ok(0)
    } else {
        warn!(failed = ?report.failed_tasks(), "finished with failed tasks");
        Ok(1)
    }
}

/// Figure out the project root all configured paths are relative to.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitepipe.toml" (parent = ""),
///   we fall back to the current working directory.
fn project_root(config_path: &Path) -> Result<PathBuf> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::path::absolute(&dir).with_context(|| format!("resolving project root {:?}", dir))
}

/// Print the resolved paths, the target's tasks and the watch bindings.
fn print_dry_run(cfg: &ConfigFile, paths: &ProjectPaths, target: Target) -> Result<()> {
    let pipeline = target.pipeline();

    println!("sitepipe dry-run");
    println!("  root   = {}", paths.root.display());
    println!("  source = {}", paths.source.display());
    println!("  build  = {}", paths.build.display());
    println!(
        "  server = http://{}:{} (cors: {})",
        cfg.server.host, cfg.server.port, cfg.server.cors
    );
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!();

    println!("target {target:?}: {pipeline}");
    for (i, task) in pipeline.topo_order()?.iter().enumerate() {
        println!("  {}. {task}", i + 1);
    }
    println!();

    if cfg.watch.is_empty() {
        println!("watch: (none)");
    } else {
        println!("watch ({}):", cfg.watch.len());
        for binding in &cfg.watch {
            let tasks: Vec<_> = binding.tasks.iter().map(|t| t.as_str()).collect();
            println!("  - {:?} -> {:?}", binding.patterns, tasks);
            if !binding.exclude.is_empty() {
                println!("      exclude: {:?}", binding.exclude);
            }
            if binding.reload {
                println!("      reload: true");
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
