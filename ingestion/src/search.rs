// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::future::Future;

use http::Method;
use serde_json::Value;

use crate::client::{SearchResponse, SignedClient};
use crate::errors::SearchError;

/// The index and document operations the ingestion workflow needs.
pub trait SearchApi {
    /// `HEAD /{index}`: 200 means present, 404 absent.
    fn index_exists(&self, index: &str) -> impl Future<Output = Result<bool, SearchError>> + Send;

    /// `PUT /{index}` with settings and mappings.
    fn create_index(
        &self,
        index: &str,
        body: &Value,
    ) -> impl Future<Output = Result<Value, SearchError>> + Send;

    /// `POST /{index}/_doc`
    fn index_document(
        &self,
        index: &str,
        document: &Value,
    ) -> impl Future<Output = Result<Value, SearchError>> + Send;

    /// `POST /{index}/_search`
    fn search(
        &self,
        index: &str,
        query: &Value,
    ) -> impl Future<Output = Result<Value, SearchError>> + Send;
}

fn into_json(response: SearchResponse) -> Result<Value, SearchError> {
    if !response.is_success() {
        return Err(SearchError::Status {
            status: response.status,
            body: response.body,
        });
    }
    if response.body.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&response.body)?)
}

impl SearchApi for SignedClient {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self.send(Method::HEAD, index, None).await?;
        match response.status {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchError::Status {
                status,
                body: response.body,
            }),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<Value, SearchError> {
        into_json(self.send(Method::PUT, index, Some(body)).await?)
    }

    async fn index_document(&self, index: &str, document: &Value) -> Result<Value, SearchError> {
        let path = format!("{index}/_doc");
        into_json(self.send(Method::POST, &path, Some(document)).await?)
    }

    async fn search(&self, index: &str, query: &Value) -> Result<Value, SearchError> {
        let path = format!("{index}/_search");
        into_json(self.send(Method::POST, &path, Some(query)).await?)
    }
}
