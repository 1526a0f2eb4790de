//! HTTP-facing error mapping: a service-layer error enum mapped
//! onto status codes, never letting a handler panic.

use crate::model::{ErrorBody, ErrorsBody};
use broker_core::BrokerError;
use poem_openapi::payload::Json;
use poem_openapi::ApiResponse;

#[derive(ApiResponse, Debug, Clone)]
pub enum ApiError {
    #[oai(status = 400)]
    BadRequest(Json<ErrorsBody>),
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
    #[oai(status = 409)]
    Conflict(Json<ErrorBody>),
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
}

impl From<BrokerError> for ApiError {
    fn from(value: BrokerError) -> Self {
        match value {
            BrokerError::UnknownJob(_) => ApiError::NotFound(Json(ErrorBody {
                error: value.to_string(),
            })),
            BrokerError::JobAlreadyExists(_) => ApiError::Conflict(Json(ErrorBody {
                error: value.to_string(),
            })),
            BrokerError::MalformedResult { .. } | BrokerError::WorkerReportedError { .. } => {
                ApiError::BadRequest(Json(ErrorsBody {
                    errors: vec![value.to_string()],
                }))
            }
            BrokerError::AssemblerIoError { .. }
            | BrokerError::CapacityExceeded
            | BrokerError::CooldownActive => ApiError::InternalError(Json(ErrorBody {
                error: value.to_string(),
            })),
        }
    }
}

impl From<uuid::Error> for ApiError {
    fn from(value: uuid::Error) -> Self {
        ApiError::BadRequest(Json(ErrorsBody {
            errors: vec![format!("malformed id: {value}")],
        }))
    }
}
