// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Deployment parameters for both units and the bootstrap state that carries
//! identifiers from one unit to the other.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::BootstrapError;

/// Sample external id. It is a placeholder, not a security boundary.
pub const PLACEHOLDER_EXTERNAL_ID: &str = "opensearch";
pub const DEFAULT_COLLECTION_NAME: &str = "my-collection";
pub const DEFAULT_INDEX_NAME: &str = "user-data";
pub const DEFAULT_REGION: &str = "eu-central-1";
pub const DEFAULT_INGESTION_ACCOUNT: &str = "123456789012";
pub const DEFAULT_SEARCH_ACCOUNT: &str = "987654321000";

pub const MIN_COLLECTION_NAME_LENGTH: u64 = 3;
pub const MAX_COLLECTION_NAME_LENGTH: u64 = 32;
pub const MAX_INDEX_NAME_LENGTH: u64 = 255;
pub const MIN_EXTERNAL_ID_LENGTH: u64 = 2;
pub const MAX_EXTERNAL_ID_LENGTH: u64 = 1224;
pub const VPC_ENDPOINT_PREFIX: &str = "vpce-";

const INDEX_NAME_FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':', ' '];
const INDEX_NAME_FORBIDDEN_START: &[char] = &['_', '-', '+'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    #[validate(length(min = 3, max = 32))]
    #[validate(custom(function = "validate_collection_name"))]
    pub collection_name: String,

    #[validate(length(min = 1, max = 255))]
    #[validate(custom(function = "validate_index_name"))]
    pub index_name: String,

    #[validate(custom(function = "validate_account_id"))]
    pub other_account_id: String,

    #[validate(length(min = 2, max = 1224))]
    #[validate(custom(function = "validate_external_id"))]
    pub external_id: String,

    /// Unknown until the ingestion unit has been deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_vpc_endpoint_id"))]
    pub vpc_endpoint_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestionParameters {
    #[validate(custom(function = "validate_aws_region"))]
    pub region: String,

    #[validate(length(min = 1, max = 255))]
    #[validate(custom(function = "validate_index_name"))]
    pub index_name: String,

    #[validate(length(min = 2, max = 1224))]
    #[validate(custom(function = "validate_external_id"))]
    pub external_id: String,

    /// Unknown until the search unit has been deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,

    /// Unknown until the search unit has been deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_role_arn"))]
    pub ingestion_role_arn: Option<String>,
}

/// Everything the operator fills in once, plus the identifiers exchanged
/// between the two units during bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapState {
    #[validate(custom(function = "validate_account_id"))]
    pub ingestion_account_id: String,
    #[validate(custom(function = "validate_account_id"))]
    pub search_account_id: String,
    #[validate(nested)]
    pub ingestion: IngestionParameters,
    #[validate(nested)]
    pub search: SearchParameters,
}

impl Default for BootstrapState {
    fn default() -> Self {
        Self {
            ingestion_account_id: DEFAULT_INGESTION_ACCOUNT.to_string(),
            search_account_id: DEFAULT_SEARCH_ACCOUNT.to_string(),
            ingestion: IngestionParameters {
                region: DEFAULT_REGION.to_string(),
                index_name: DEFAULT_INDEX_NAME.to_string(),
                external_id: PLACEHOLDER_EXTERNAL_ID.to_string(),
                collection_id: None,
                ingestion_role_arn: None,
            },
            search: SearchParameters {
                collection_name: DEFAULT_COLLECTION_NAME.to_string(),
                index_name: DEFAULT_INDEX_NAME.to_string(),
                other_account_id: DEFAULT_INGESTION_ACCOUNT.to_string(),
                external_id: PLACEHOLDER_EXTERNAL_ID.to_string(),
                vpc_endpoint_id: None,
            },
        }
    }
}

impl BootstrapState {
    /// Field validation plus the cross-unit agreements: the search unit trusts
    /// the ingestion account, both sides use the same external id, and the
    /// ingestion workload writes to the index the data-access policy names.
    pub fn check(&self) -> Result<(), BootstrapError> {
        self.validate()?;

        if self.search.other_account_id != self.ingestion_account_id {
            return Err(BootstrapError::Inconsistent(format!(
                "search stack trusts account {} but ingestion runs in {}",
                self.search.other_account_id, self.ingestion_account_id
            )));
        }
        if self.search.external_id != self.ingestion.external_id {
            return Err(BootstrapError::Inconsistent(
                "external id differs between units".to_string(),
            ));
        }
        if self.search.index_name != self.ingestion.index_name {
            return Err(BootstrapError::Inconsistent(format!(
                "ingestion writes to index {} but access is granted on {}",
                self.ingestion.index_name, self.search.index_name
            )));
        }
        Ok(())
    }

    pub fn uses_placeholder_external_id(&self) -> bool {
        self.search.external_id == PLACEHOLDER_EXTERNAL_ID
            || self.ingestion.external_id == PLACEHOLDER_EXTERNAL_ID
    }

    pub async fn load(path: &Path) -> Result<Self, BootstrapError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| BootstrapError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn save(&self, path: &Path) -> Result<(), BootstrapError> {
        let payload = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, payload)
            .await
            .map_err(|err| BootstrapError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            })
    }
}

/// Collection names: lowercase letter first, then lowercase letters, digits and hyphens.
pub fn is_valid_collection_name(name: &str) -> bool {
    let len = name.len() as u64;
    if !(MIN_COLLECTION_NAME_LENGTH..=MAX_COLLECTION_NAME_LENGTH).contains(&len) {
        return false;
    }
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Index names: lowercase, no path or wildcard characters, no leading `_`, `-` or `+`.
pub fn is_valid_index_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() as u64 <= MAX_INDEX_NAME_LENGTH
        && name != "."
        && name != ".."
        && !name.starts_with(INDEX_NAME_FORBIDDEN_START)
        && !name.contains(INDEX_NAME_FORBIDDEN)
        && !name.chars().any(|c| c.is_uppercase() || c.is_control())
}

/// Endpoint ids look like `vpce-0a1b2c3d`.
pub fn is_valid_vpc_endpoint_id(id: &str) -> bool {
    match id.strip_prefix(VPC_ENDPOINT_PREFIX) {
        Some(suffix) => {
            !suffix.is_empty()
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

pub fn is_valid_account_id(account_id: &str) -> bool {
    account_id.len() == 12 && account_id.chars().all(|c| c.is_ascii_digit())
}

fn validate_collection_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_collection_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_collection_name"))
    }
}

fn validate_index_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_index_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_index_name"))
    }
}

fn validate_account_id(account_id: &str) -> Result<(), ValidationError> {
    if is_valid_account_id(account_id) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_account_id"))
    }
}

fn validate_vpc_endpoint_id(id: &str) -> Result<(), ValidationError> {
    if is_valid_vpc_endpoint_id(id) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_vpc_endpoint_id"))
    }
}

fn validate_external_id(external_id: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_+=,.@:/-".contains(c);
    if external_id.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_external_id"))
    }
}

fn validate_role_arn(arn: &str) -> Result<(), ValidationError> {
    let mut parts = arn.splitn(6, ':');
    let valid = parts.next() == Some("arn")
        && parts.next().is_some_and(|p| p.starts_with("aws"))
        && parts.next() == Some("iam")
        && parts.next() == Some("")
        && parts.next().is_some_and(is_valid_account_id)
        && parts.next().is_some_and(|r| r.starts_with("role/") && r.len() > 5);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_role_arn"))
    }
}

/// Validates AWS region format (e.g., "us-east-1", "eu-central-1")
/// Pattern: two lowercase letters, hyphen, lowercase letters, hyphen, digits
pub fn validate_aws_region(region: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return Err(ValidationError::new("invalid_aws_region"));
    }

    let first = parts[0];
    if first.len() != 2 || !first.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new("invalid_aws_region"));
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::new("invalid_aws_region"));
        }
    }

    let last = parts[parts.len() - 1];
    if last.is_empty() || !last.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("invalid_aws_region"));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_consistent() {
        let state = BootstrapState::default();
        assert!(state.check().is_ok());
        assert!(state.uses_placeholder_external_id());
    }

    #[test]
    fn test_collection_name_grammar() {
        assert!(is_valid_collection_name("my-collection"));
        assert!(is_valid_collection_name("abc"));
        assert!(!is_valid_collection_name("ab"));
        assert!(!is_valid_collection_name("My-Collection"));
        assert!(!is_valid_collection_name("1collection"));
        assert!(!is_valid_collection_name("my*"));
        assert!(!is_valid_collection_name(&"a".repeat(33)));
    }

    #[test]
    fn test_index_name_grammar() {
        assert!(is_valid_index_name("user-data"));
        assert!(is_valid_index_name("logs.2024"));
        assert!(!is_valid_index_name(""));
        assert!(!is_valid_index_name("_internal"));
        assert!(!is_valid_index_name("-x"));
        assert!(!is_valid_index_name("User"));
        assert!(!is_valid_index_name("a/b"));
        assert!(!is_valid_index_name("*"));
        assert!(!is_valid_index_name("with space"));
    }

    #[test]
    fn test_vpc_endpoint_id_grammar() {
        assert!(is_valid_vpc_endpoint_id("vpce-abc123"));
        assert!(!is_valid_vpc_endpoint_id(""));
        assert!(!is_valid_vpc_endpoint_id("vpce-"));
        assert!(!is_valid_vpc_endpoint_id("abc123"));
        assert!(!is_valid_vpc_endpoint_id("vpce-ABC"));
    }

    #[test]
    fn test_validate_aws_region() {
        assert!(validate_aws_region("eu-central-1").is_ok());
        assert!(validate_aws_region("us-gov-west-1").is_ok());
        assert!(validate_aws_region("invalid-region").is_err());
        assert!(validate_aws_region("EU-central-1").is_err());
    }

    #[test]
    fn test_role_arn_validation() {
        assert!(validate_role_arn("arn:aws:iam::987654321000:role/IngestionRole").is_ok());
        assert!(validate_role_arn("arn:aws:iam::987654321000:user/someone").is_err());
        assert!(validate_role_arn("arn:aws:iam::98765:role/x").is_err());
        assert!(validate_role_arn("").is_err());
    }

    #[test]
    fn test_inconsistent_trusted_account() {
        let mut state = BootstrapState::default();
        state.search.other_account_id = "111111111111".to_string();
        assert!(matches!(state.check(), Err(BootstrapError::Inconsistent(_))));
    }

    #[test]
    fn test_inconsistent_index_name() {
        let mut state = BootstrapState::default();
        state.ingestion.index_name = "user-metadata".to_string();
        assert!(matches!(state.check(), Err(BootstrapError::Inconsistent(_))));
    }

    #[test]
    fn test_invalid_endpoint_rejected_by_validation() {
        let mut state = BootstrapState::default();
        state.search.vpc_endpoint_id = Some("not-an-endpoint".to_string());
        assert!(matches!(state.check(), Err(BootstrapError::InvalidState(_))));
    }

    #[test]
    fn test_state_json_uses_camel_case() {
        let value = serde_json::to_value(BootstrapState::default()).unwrap();
        assert_eq!(value["search"]["collectionName"], "my-collection");
        assert_eq!(value["ingestion"]["region"], "eu-central-1");
        assert!(value["search"].get("vpcEndpointId").is_none());
    }
}
