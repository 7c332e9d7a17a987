use std::sync::Arc;

use actix_web::web;
use anyhow::{Context, bail};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use playground::config::{CliArgs, Config};
use playground::executor::LocalExecutor;
use playground::queue::JobQueue;
use playground::results::JobResults;
use playground::service::JobService;
use playground::web_server::build_server;
use playground::worker::{Pipeline, worker};
use playground::workspace::Workspaces;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let n_workers = cli.workers;

    if n_workers == 0 {
        bail!("The number of workers must not be 0");
    }

    let Config {
        server: server_config,
        cache: cache_config,
        workspace: workspace_config,
        limits,
        languages,
    } = cli.to_config().context("Failed to load configuration")?;

    let workspaces = match workspace_config.root {
        Some(root) => Workspaces::new(root),
        None => Workspaces::in_cache_dir()?,
    };
    log::info!("Job workspaces live in {}", workspaces.root().display());

    let results = Arc::new(
        JobResults::start(
            cache_config.capacity,
            cache_config.ttl(),
            cache_config.sweep_interval(),
        )
        .context("Failed to create result cache")?,
    );
    let workspaces = Arc::new(workspaces);
    let job_queue = Arc::new(JobQueue::new());
    let pipeline = Arc::new(Pipeline::new(
        results.clone(),
        workspaces.clone(),
        Arc::new(LocalExecutor),
        limits,
    ));
    let service = web::Data::new(JobService::new(
        results,
        workspaces,
        languages,
        job_queue.clone(),
    ));
    let shutdown_token = CancellationToken::new();

    // ======= PREPARATION END, EXECUTION START =======

    let mut workers = JoinSet::new();
    for i in 1..=n_workers {
        workers.spawn(worker(
            i,
            pipeline.clone(),
            job_queue.clone(),
            shutdown_token.clone(),
        ));
    }

    let server = build_server(server_config, service).context("Failed to build server")?;

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
        Some(res_worker) = workers.join_next() => {
            log::error!("A worker terminated unexpectedly: {:?}", res_worker);
        }
    }

    // 1. Stop accepting submissions
    server_handle.stop(true).await;

    // 2. Let workers finish their current job
    shutdown_token.cancel();
    log::info!("Shutdown signal sent to workers, waiting for them to finish...");

    // 3. Wait until every worker terminates
    while let Some(res) = workers.join_next().await {
        match res {
            Ok(Err(e)) => log::error!("Worker finished with error: {e:#}"),
            Err(e) if e.is_panic() => log::error!("Worker handle panicked: {:?}", e),
            Err(e) => log::error!("Worker handle finished with error: {:?}", e),
            Ok(Ok(())) => {}
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}
