//! Thin `reqwest` client for the worker↔broker HTTP surface: `POST
//! /poll` and `POST /results`. Every request is independent; retries and
//! backoff are the caller's ([`crate::runner::WorkerRunner`]) concern.

use crate::error::WorkerError;
use crate::wire::{PollRequestWire, RegionalTaskWire, RegionalWorkResultWire};

pub struct BrokerClient {
    http: reqwest::Client,
    base_url: String,
}

impl BrokerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn poll(&self, request: &PollRequestWire) -> Result<Vec<RegionalTaskWire>, WorkerError> {
        let response = self
            .http
            .post(format!("{}/poll", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::into_json(response).await
    }

    pub async fn post_result(&self, result: &RegionalWorkResultWire) -> Result<(), WorkerError> {
        let response = self
            .http
            .post(format!("{}/results", self.base_url))
            .json(result)
            .send()
            .await?;
        // `/results` responds 200 unconditionally; the broker has
        // already decided whether to keep or discard it.
        response.error_for_status()?;
        Ok(())
    }

    async fn into_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, WorkerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::UnexpectedStatus { status, body });
        }
        Ok(response.json().await?)
    }
}
