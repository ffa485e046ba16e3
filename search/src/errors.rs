// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use aoss_provisioning::errors::ProvisionError;

use crate::policy::Permission;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PolicyError {
    #[error("invalid collection name: {0:?}")]
    InvalidCollectionName(String),
    #[error("invalid index name: {0:?}")]
    InvalidIndexName(String),
    #[error("no VPC endpoint allow-listed, the collection would be unreachable")]
    EmptyEndpoint,
    #[error("invalid VPC endpoint id: {0:?}")]
    InvalidEndpoint(String),
    #[error("destructive permission {0:?} cannot be granted")]
    DestructivePermission(Permission),
    #[error("permission {permission:?} does not apply to {resource}")]
    PermissionScope {
        permission: Permission,
        resource: String,
    },
    #[error("a data access policy needs exactly one principal, got {0}")]
    PrincipalCount(usize),
    #[error("invalid account id: {0:?}")]
    InvalidAccountId(String),
    #[error("external id must not be empty")]
    EmptyExternalId,
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl From<serde_json::Error> for PolicyError {
    fn from(source: serde_json::Error) -> Self {
        tracing::error!("{:?}", source);
        PolicyError::Serialization(source.to_string())
    }
}

impl From<validator::ValidationErrors> for PolicyError {
    fn from(source: validator::ValidationErrors) -> Self {
        PolicyError::InvalidParameters(source.to_string())
    }
}
