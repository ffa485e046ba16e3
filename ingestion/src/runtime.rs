// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Minimal client for the Lambda runtime API.
//!
//! ```text
//! GET  /2018-06-01/runtime/invocation/next
//! POST /2018-06-01/runtime/invocation/{request_id}/response
//! POST /2018-06-01/runtime/invocation/{request_id}/error
//! POST /2018-06-01/runtime/init/error
//! ```

use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use crate::constants::{DEADLINE_HEADER, REQUEST_ID_HEADER, RUNTIME_API_VERSION};
use crate::errors::{RuntimeError, WorkflowError};

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub request_id: String,
    pub deadline_ms: Option<u64>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_message: String,
    pub error_type: String,
}

impl From<&WorkflowError> for ErrorReport {
    fn from(error: &WorkflowError) -> Self {
        Self {
            error_message: error.to_string(),
            error_type: error.kind().to_string(),
        }
    }
}

pub struct RuntimeClient {
    http: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// `api` is the `host:port` found in `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(api: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{api}/{RUNTIME_API_VERSION}/runtime"),
        }
    }

    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let response = self
            .http
            .get(format!("{}/invocation/next", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let request_id = header(REQUEST_ID_HEADER).ok_or(RuntimeError::MissingRequestId)?;
        let deadline_ms = header(DEADLINE_HEADER).and_then(|value| value.parse().ok());

        let body = response.bytes().await?;
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)?
        };

        Ok(Invocation {
            request_id,
            deadline_ms,
            payload,
        })
    }

    pub async fn respond(&self, request_id: &str, body: &impl Serialize) -> Result<(), RuntimeError> {
        let url = format!("{}/invocation/{}/response", self.base_url, request_id);
        self.post(&url, body).await
    }

    pub async fn fail(&self, request_id: &str, report: &ErrorReport) -> Result<(), RuntimeError> {
        let url = format!("{}/invocation/{}/error", self.base_url, request_id);
        self.post(&url, report).await
    }

    pub async fn init_error(&self, report: &ErrorReport) -> Result<(), RuntimeError> {
        let url = format!("{}/init/error", self.base_url);
        self.post(&url, report).await
    }

    async fn post(&self, url: &str, body: &impl Serialize) -> Result<(), RuntimeError> {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Handles one invocation: a workflow error is reported to the runtime as
    /// an invocation error, not returned.
    #[tracing::instrument(skip_all)]
    pub async fn serve_once<F, Fut, T>(&self, handler: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(Invocation) -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
        T: Serialize,
    {
        let invocation = self.next_invocation().await?;
        let request_id = invocation.request_id.clone();
        tracing::info!("[runtime] invocation {}", request_id);

        match handler(invocation).await {
            Ok(output) => self.respond(&request_id, &output).await,
            Err(err) => {
                tracing::error!("[runtime] invocation {} failed: {}", request_id, err);
                self.fail(&request_id, &ErrorReport::from(&err)).await
            }
        }
    }

    /// Serves invocations until the runtime API becomes unreachable.
    pub async fn serve<F, Fut, T>(&self, handler: F) -> Result<(), RuntimeError>
    where
        F: Fn(Invocation) -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
        T: Serialize,
    {
        loop {
            self.serve_once(&handler).await?;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;

    #[test]
    fn test_error_report_shape() {
        let error = WorkflowError::MissingConfig(ConfigError::Missing("AOSS_REGION"));
        let report = serde_json::to_value(ErrorReport::from(&error)).unwrap();
        assert_eq!(report["errorType"], "ConfigurationMissing");
        assert_eq!(
            report["errorMessage"],
            "missing required configuration: AOSS_REGION"
        );
    }

    #[test]
    fn test_base_url() {
        let client = RuntimeClient::new("127.0.0.1:9001");
        assert_eq!(client.base_url, "http://127.0.0.1:9001/2018-06-01/runtime");
    }
}
