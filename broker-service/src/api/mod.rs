use broker_core::Broker;
use poem::Route;
use poem_openapi::{OpenApiService, Tags};
use std::sync::Arc;

use crate::config::BrokerServiceConfig;

pub mod healthcheck;
pub mod jobs;
pub mod worker;

#[derive(Tags)]
enum ApiTags {
    Worker,
    Jobs,
    HealthCheck,
}

type ApiServices = (worker::WorkerApi, jobs::JobsApi, healthcheck::HealthcheckApi);

pub fn make_open_api_service(
    broker: Arc<Broker>,
    config: &BrokerServiceConfig,
) -> OpenApiService<ApiServices, ()> {
    OpenApiService::new(
        (
            worker::WorkerApi::new(broker.clone()),
            jobs::JobsApi::new(broker, config),
            healthcheck::HealthcheckApi,
        ),
        "Regional Analysis Broker API",
        broker_common::VERSION,
    )
}

pub fn combined_routes(broker: Arc<Broker>, config: &BrokerServiceConfig) -> Route {
    let api_service = make_open_api_service(broker, config);
    let ui = api_service.swagger_ui();
    let spec = api_service.spec_endpoint_yaml();

    Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .nest("/specs", spec)
}
