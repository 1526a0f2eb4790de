use broker_common::tracing_init::init_tracing;
use broker_worker::client::BrokerClient;
use broker_worker::config;
use broker_worker::runner::WorkerRunner;
use broker_worker::synthetic::SyntheticTravelTimeSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), std::io::Error> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("worker.toml"));

    let cfg = config::load(&config_path).map_err(|err| {
        eprintln!("config load error: {err}");
        std::io::Error::other(err.to_string())
    })?;

    init_tracing(&cfg.tracing);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cfg))
}

async fn async_main(cfg: config::WorkerServiceConfig) -> Result<(), std::io::Error> {
    let worker_id = broker_common::ids::WorkerId::new().to_string();
    info!(
        broker_url = %cfg.broker_url,
        network_id = %cfg.network_id,
        %worker_id,
        "starting broker-worker"
    );

    let runner = WorkerRunner::new(
        BrokerClient::new(cfg.broker_url.clone()),
        worker_id,
        cfg.network_id,
        cfg.software_version,
        cfg.max_tasks_requested,
        cfg.single_point_capable,
        cfg.poll_sleep,
        Arc::new(SyntheticTravelTimeSource::default()),
    );

    tokio::select! {
        _ = runner.run_forever() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
