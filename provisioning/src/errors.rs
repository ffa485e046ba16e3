// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ProvisionError {
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("resource {resource} references unknown resource {target}")]
    UnknownReference { resource: String, target: String },
    #[error("resource {resource} has no attribute {attribute}")]
    UnknownAttribute { resource: String, attribute: String },
    #[error("dependency cycle between resources: {0:?}")]
    DependencyCycle(Vec<String>),
    #[error("unsupported intrinsic: {0}")]
    UnsupportedIntrinsic(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProvisionError {
    fn from(source: serde_json::Error) -> Self {
        tracing::error!("{:?}", source);
        ProvisionError::Serialization(source.to_string())
    }
}

impl From<validator::ValidationErrors> for ProvisionError {
    fn from(source: validator::ValidationErrors) -> Self {
        ProvisionError::InvalidParameters(source.to_string())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum BootstrapError {
    #[error("stack {stack} is missing output {key}")]
    MissingOutput { stack: String, key: String },
    #[error("invalid bootstrap state: {0}")]
    InvalidState(String),
    #[error("inconsistent bootstrap state: {0}")]
    Inconsistent(String),
    #[error("unable to read or write {path}: {message}")]
    Io { path: String, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BootstrapError {
    fn from(source: serde_json::Error) -> Self {
        tracing::error!("{:?}", source);
        BootstrapError::Serialization(source.to_string())
    }
}

impl From<validator::ValidationErrors> for BootstrapError {
    fn from(source: validator::ValidationErrors) -> Self {
        BootstrapError::InvalidState(source.to_string())
    }
}
