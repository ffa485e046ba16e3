// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

use aws_credential_types::provider::error::CredentialsError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("search service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unable to sign request: {0}")]
    Signing(String),
    #[error("unable to obtain credentials: {0}")]
    Credentials(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Anything that aborts the workflow. Index creation failures never end up here.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error(transparent)]
    MissingConfig(#[from] ConfigError),
    #[error("unable to assume ingestion role: {0}")]
    AssumeRole(String),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("workflow did not finish within {0:?}")]
    Timeout(Duration),
}

impl WorkflowError {
    /// Short error type reported to the invoking runtime.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingConfig(_) => "ConfigurationMissing",
            Self::AssumeRole(_) => "AssumeRoleFailed",
            Self::Search(_) => "SearchFailed",
            Self::Timeout(_) => "Timeout",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("runtime api transport error: {0}")]
    Transport(String),
    #[error("runtime api returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invocation without request id")]
    MissingRequestId,
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(source: reqwest::Error) -> Self {
        tracing::error!("{:?}", source);
        SearchError::Transport(source.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(source: serde_json::Error) -> Self {
        tracing::error!("{:?}", source);
        SearchError::Serialization(source.to_string())
    }
}

impl From<CredentialsError> for SearchError {
    fn from(source: CredentialsError) -> Self {
        tracing::error!("{:?}", source);
        SearchError::Credentials(source.to_string())
    }
}

impl From<reqwest::Error> for RuntimeError {
    fn from(source: reqwest::Error) -> Self {
        tracing::error!("{:?}", source);
        RuntimeError::Transport(source.to_string())
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(source: serde_json::Error) -> Self {
        tracing::error!("{:?}", source);
        RuntimeError::Serialization(source.to_string())
    }
}
