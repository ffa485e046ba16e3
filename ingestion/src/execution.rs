// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The ingestion function and the identity it runs as.

use std::collections::BTreeMap;

use aoss_provisioning::iam::{ASSUME_ROLE_ACTION, PolicyDocument, Principal, Statement};
use aoss_provisioning::parameters::IngestionParameters;
use aoss_provisioning::template::{Resource, get_att};
use serde_json::{Value, json};

use crate::constants::{
    ENV_COLLECTION_ID, ENV_EXTERNAL_ID, ENV_INDEX_NAME, ENV_REGION, ENV_ROLE_ARN, FUNCTION_HANDLER,
    FUNCTION_MEMORY_MIB, FUNCTION_RUNTIME, FUNCTION_TIMEOUT_SECS, LAMBDA_SERVICE_PRINCIPAL,
    VPC_ACCESS_POLICY_ARN,
};
use crate::network::NetworkBoundary;

pub const EXECUTION_ROLE_ID: &str = "IngestionFunctionRole";
pub const FUNCTION_ID: &str = "IngestionFunction";
const ASSUME_POLICY_NAME: &str = "AssumeSearchAccountRole";

/// Where the packaged `bootstrap` binary lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub bucket: String,
    pub key: String,
}

impl CodeLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Environment handed to the function. Identifiers not yet known are passed
/// as empty strings and rejected by the function at start.
pub fn environment(parameters: &IngestionParameters) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (ENV_REGION, parameters.region.clone()),
        (
            ENV_COLLECTION_ID,
            parameters.collection_id.clone().unwrap_or_default(),
        ),
        (
            ENV_ROLE_ARN,
            parameters.ingestion_role_arn.clone().unwrap_or_default(),
        ),
        (ENV_EXTERNAL_ID, parameters.external_id.clone()),
        (ENV_INDEX_NAME, parameters.index_name.clone()),
    ])
}

/// Trusted by the Lambda service; may attach to the VPC and, once the search
/// account has produced its role, assume that role.
pub struct ExecutionRole<'a> {
    target_role_arn: Option<&'a str>,
}

impl<'a> ExecutionRole<'a> {
    pub fn new(target_role_arn: Option<&'a str>) -> Self {
        Self {
            target_role_arn: target_role_arn.filter(|arn| !arn.trim().is_empty()),
        }
    }

    pub fn trust_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![
            Statement::allow(&[ASSUME_ROLE_ACTION])
                .principal(Principal::Service(LAMBDA_SERVICE_PRINCIPAL.to_string())),
        ])
    }

    pub fn assume_policy(&self) -> Option<PolicyDocument> {
        self.target_role_arn.map(|arn| {
            PolicyDocument::new(vec![
                Statement::allow(&[ASSUME_ROLE_ACTION]).resources(vec![Value::from(arn)]),
            ])
        })
    }

    pub fn to_resource(&self) -> Result<Resource, serde_json::Error> {
        let mut resource = Resource::new("AWS::IAM::Role")
            .with_property(
                "AssumeRolePolicyDocument",
                serde_json::to_value(self.trust_policy())?,
            )
            .with_property("ManagedPolicyArns", json!([VPC_ACCESS_POLICY_ARN]));
        if let Some(policy) = self.assume_policy() {
            resource = resource.with_property(
                "Policies",
                json!([{
                    "PolicyName": ASSUME_POLICY_NAME,
                    "PolicyDocument": serde_json::to_value(policy)?,
                }]),
            );
        }
        Ok(resource)
    }
}

pub fn function_resource(
    parameters: &IngestionParameters,
    code: &CodeLocation,
    network: &NetworkBoundary,
) -> Resource {
    Resource::new("AWS::Lambda::Function")
        .with_property("Runtime", FUNCTION_RUNTIME)
        .with_property("Handler", FUNCTION_HANDLER)
        .with_property("Timeout", FUNCTION_TIMEOUT_SECS)
        .with_property("MemorySize", FUNCTION_MEMORY_MIB)
        .with_property("Role", get_att(EXECUTION_ROLE_ID, "Arn"))
        .with_property(
            "Code",
            json!({ "S3Bucket": code.bucket, "S3Key": code.key }),
        )
        .with_property(
            "VpcConfig",
            json!({
                "SubnetIds": network.private_subnet_refs(),
                "SecurityGroupIds": network.security_group_refs(),
            }),
        )
        .with_property(
            "Environment",
            json!({ "Variables": environment(parameters) }),
        )
}
