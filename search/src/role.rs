// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use aoss_provisioning::iam::{
    ASSUME_ROLE_ACTION, EXTERNAL_ID_CONDITION_KEY, PolicyDocument, Principal, Statement,
};
use aoss_provisioning::parameters::{
    PLACEHOLDER_EXTERNAL_ID, is_valid_account_id, is_valid_collection_name,
};
use aoss_provisioning::template::{Resource, placeholder};
use serde_json::{Value, json};

use crate::constants::{
    API_ACCESS_ALL, COLLECTION_CONDITION_KEY, INGESTION_ROLE_ID, INLINE_POLICY_NAME,
    ROLE_RESOURCE_TYPE,
};
use crate::errors::PolicyError;

/// The identity the ingestion account assumes to reach the collection.
///
/// Any principal of the trusted account may assume it, provided the call
/// carries the external id. The role itself may only call the service API
/// against the one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedRole {
    collection_name: String,
    trusted_account_id: String,
    external_id: String,
}

impl TrustedRole {
    pub fn new(
        collection_name: &str,
        trusted_account_id: &str,
        external_id: &str,
    ) -> Result<Self, PolicyError> {
        if !is_valid_collection_name(collection_name) {
            return Err(PolicyError::InvalidCollectionName(collection_name.to_string()));
        }
        if !is_valid_account_id(trusted_account_id) {
            return Err(PolicyError::InvalidAccountId(trusted_account_id.to_string()));
        }
        if external_id.trim().is_empty() {
            return Err(PolicyError::EmptyExternalId);
        }
        if external_id == PLACEHOLDER_EXTERNAL_ID {
            tracing::warn!(
                "[search] role {} trusts the sample external id",
                INGESTION_ROLE_ID
            );
        }

        Ok(Self {
            collection_name: collection_name.to_string(),
            trusted_account_id: trusted_account_id.to_string(),
            external_id: external_id.to_string(),
        })
    }

    /// The role ARN as a late-bound template placeholder.
    pub fn arn() -> String {
        placeholder(INGESTION_ROLE_ID, "Arn")
    }

    pub fn trusted_account_id(&self) -> &str {
        &self.trusted_account_id
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn uses_placeholder_external_id(&self) -> bool {
        self.external_id == PLACEHOLDER_EXTERNAL_ID
    }

    pub fn trust_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![
            Statement::allow(&[ASSUME_ROLE_ACTION])
                .principal(Principal::account(&self.trusted_account_id))
                .string_equals(EXTERNAL_ID_CONDITION_KEY, &self.external_id),
        ])
    }

    pub fn inline_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![
            Statement::allow(&[API_ACCESS_ALL])
                .resources(vec![Value::from("*")])
                .string_equals(COLLECTION_CONDITION_KEY, &self.collection_name),
        ])
    }

    /// Evaluates the trust policy for an assume-role call.
    pub fn can_be_assumed_by(&self, account_id: &str, external_id: Option<&str>) -> bool {
        let caller = Principal::account(account_id);
        self.trust_policy().statement.iter().any(|statement| {
            statement.principal.as_ref() == Some(&caller)
                && statement.action.iter().any(|a| a == ASSUME_ROLE_ACTION)
                && statement.required_value(EXTERNAL_ID_CONDITION_KEY) == external_id
        })
    }

    pub fn to_resource(&self) -> Result<Resource, PolicyError> {
        Ok(Resource::new(ROLE_RESOURCE_TYPE)
            .with_property(
                "AssumeRolePolicyDocument",
                serde_json::to_value(self.trust_policy())?,
            )
            .with_property(
                "Description",
                format!(
                    "Role to ingest data to OpenSearch Serverless collection {}",
                    self.collection_name
                ),
            )
            .with_property(
                "Policies",
                json!([{
                    "PolicyName": INLINE_POLICY_NAME,
                    "PolicyDocument": serde_json::to_value(self.inline_policy())?,
                }]),
            ))
    }
}
