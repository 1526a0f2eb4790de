//! End-to-end coverage of the worker↔broker HTTP surface, driven
//! through `poem::test::TestClient`.

use broker_common::events::TracingEventBus;
use broker_core::assembler::LocalFileStorage;
use broker_core::catalog::WorkerCatalog;
use broker_core::clock::SystemClock;
use broker_core::launcher::NoopWorkerLauncher;
use broker_core::{Broker, BrokerConfig};
use broker_service::api;
use broker_service::config::BrokerServiceConfig;
use poem::test::TestClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn test_broker(work_dir: &std::path::Path) -> (Arc<Broker>, BrokerServiceConfig) {
    let config = BrokerServiceConfig {
        offline: true,
        work_dir: work_dir.join("work"),
        storage_dir: work_dir.join("storage"),
        ..BrokerServiceConfig::default()
    };
    std::fs::create_dir_all(&config.work_dir).unwrap();
    std::fs::create_dir_all(&config.storage_dir).unwrap();

    let broker = Arc::new(Broker::new(
        BrokerConfig {
            offline: true,
            max_workers: config.max_workers,
            worker_startup_cooldown: Duration::from_secs(60 * 60),
        },
        WorkerCatalog::new(Duration::from_secs(60)),
        Arc::new(SystemClock),
        Arc::new(NoopWorkerLauncher),
        Arc::new(LocalFileStorage::new(config.storage_dir.clone())),
        Arc::new(TracingEventBus),
    ));
    (broker, config)
}

fn tiny_job_body() -> serde_json::Value {
    json!({
        "category": { "networkId": "seattle", "softwareVersion": "1.0" },
        "workerTags": [],
        "template": {
            "grid": { "width": 3, "height": 3 },
            "analysis": {
                "percentiles": [50],
                "cutoffSeconds": 600,
                "iterationSource": { "type": "Headway", "windowMinutes": 10 },
                "destinationOpportunityCounts": null
            }
        },
        "origins": [
            { "lat": 47.6, "lon": -122.3 },
            { "lat": 47.7, "lon": -122.4 }
        ],
        "hasTransit": false,
        "zoom": 9,
        "includePathResults": false,
        "originPointSet": false,
        "wantsTravelTimes": true
    })
}

#[tokio::test]
async fn submit_poll_and_report_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let (broker, config) = test_broker(tmp.path());
    let app = api::combined_routes(broker.clone(), &config);
    let cli = TestClient::new(app);

    let submit_resp = cli.post("/jobs").body_json(&tiny_job_body()).send().await;
    submit_resp.assert_status_is_ok();
    let submitted: serde_json::Value = submit_resp.json().await.value().deserialize();
    let job_id = submitted["jobId"].as_str().unwrap().to_string();

    let poll_resp = cli
        .post("/poll")
        .body_json(&json!({
            "workerId": "00000000-0000-0000-0000-000000000001",
            "category": { "networkId": "seattle", "softwareVersion": "1.0" },
            "maxTasksRequested": 16,
            "tasksInFlight": 0,
            "singlePointCapable": false
        }))
        .send()
        .await;
    poll_resp.assert_status_is_ok();
    let tasks: serde_json::Value = poll_resp.json().await.value().deserialize();
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);

    for task in tasks {
        let task_id = task["taskId"].as_u64().unwrap();
        let result_resp = cli
            .post("/results")
            .body_json(&json!({
                "jobId": job_id,
                "taskId": task_id,
                "error": null,
                "travelTimesByPercentile": [[60, 120, 180, 240, 300, 360, 420, 480, 540]],
                "accessibility": null
            }))
            .send()
            .await;
        result_resp.assert_status_is_ok();
    }

    // The job disappears from listings once fully complete and flushed.
    let list_resp = cli.get("/jobs").send().await;
    list_resp.assert_status_is_ok();
    let jobs: serde_json::Value = list_resp.json().await.value().deserialize();
    assert!(jobs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_job_delete_returns_404() {
    let tmp = tempfile::tempdir().unwrap();
    let (broker, config) = test_broker(tmp.path());
    let app = api::combined_routes(broker, &config);
    let cli = TestClient::new(app);

    let resp = cli
        .delete("/jobs/00000000-0000-0000-0000-000000000099")
        .send()
        .await;
    resp.assert_status(poem::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthcheck_and_version_respond() {
    let tmp = tempfile::tempdir().unwrap();
    let (broker, config) = test_broker(tmp.path());
    let app = api::combined_routes(broker, &config);
    let cli = TestClient::new(app);

    cli.get("/healthcheck").send().await.assert_status_is_ok();
    let version_resp = cli.get("/version").send().await;
    version_resp.assert_status_is_ok();
}
