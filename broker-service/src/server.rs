use broker_common::tracing_init::init_tracing;
use broker_service::{api, bootstrap, config, metrics};
use poem::endpoint::PrometheusExporter;
use poem::listener::TcpListener;
use poem::EndpointExt;
use std::path::PathBuf;
use tracing::{error, info};

fn main() -> Result<(), std::io::Error> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("broker.toml"));

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

async fn async_main(cfg: config::BrokerServiceConfig) -> Result<(), std::io::Error> {
    let http_port = cfg.http_port;
    info!(http_port, offline = cfg.offline, "starting broker-service");

    let broker = bootstrap::build_broker(&cfg).map_err(|err| {
        error!("broker init error: {err}");
        err
    })?;

    let app = api::combined_routes(broker.clone(), &cfg)
        .nest("/metrics", PrometheusExporter::new(metrics::registry()));

    let server = poem::Server::new(TcpListener::bind(format!("0.0.0.0:{http_port}")));

    tokio::select! {
        result = server.run(app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
