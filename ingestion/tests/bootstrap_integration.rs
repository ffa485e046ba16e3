// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Drives the two-phase bootstrap across both units with one in-process
//! provisioner per account.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use aoss_ingestion::configuration::IngestOptions;
use aoss_ingestion::execution::{CodeLocation, EXECUTION_ROLE_ID, FUNCTION_ID};
use aoss_ingestion::stack::IngestionStack;
use aoss_provisioning::bootstrap::{BootstrapStep, reconcile};
use aoss_provisioning::outputs::{
    COLLECTION_ENDPOINT, COLLECTION_ID, INGESTION_ROLE_ARN, INGESTION_STACK, SAMPLE_INGESTION_ROLE,
    SEARCH_STACK, StackOutputs, TARGET_COLLECTION_ID, VPC_ENDPOINT_ID,
};
use aoss_provisioning::parameters::{BootstrapState, DEFAULT_INGESTION_ACCOUNT, DEFAULT_SEARCH_ACCOUNT};
use aoss_provisioning::provisioner::{LocalProvisioner, Provisioner};
use aoss_search_stack::stack::SearchStack;
use serde_json::Value;

struct Accounts {
    ingestion: LocalProvisioner,
    search: LocalProvisioner,
    ingestion_outputs: Option<StackOutputs>,
    search_outputs: Option<StackOutputs>,
}

impl Accounts {
    fn new() -> Self {
        Self {
            ingestion: LocalProvisioner::with_seed(DEFAULT_INGESTION_ACCOUNT, "eu-central-1", 1),
            search: LocalProvisioner::with_seed(DEFAULT_SEARCH_ACCOUNT, "eu-central-1", 2),
            ingestion_outputs: None,
            search_outputs: None,
        }
    }

    /// Reconciles and applies the resulting deployment until complete.
    async fn bootstrap(&mut self, state: &mut BootstrapState) -> Vec<BootstrapStep> {
        let code = CodeLocation::new("artifacts", "aoss-ingestion/bootstrap.zip");
        let mut steps = Vec::new();
        for _ in 0..6 {
            let step = reconcile(
                state,
                self.ingestion_outputs.as_ref(),
                self.search_outputs.as_ref(),
            )
            .unwrap();
            steps.push(step.clone());
            match step {
                BootstrapStep::DeployIngestion | BootstrapStep::RedeployIngestion { .. } => {
                    let template = IngestionStack::synth(&state.ingestion, &code).unwrap();
                    self.ingestion_outputs =
                        Some(self.ingestion.deploy(INGESTION_STACK, &template).await.unwrap());
                }
                BootstrapStep::DeploySearch { .. } => {
                    let template = SearchStack::synth(&state.search).unwrap();
                    self.search_outputs =
                        Some(self.search.deploy(SEARCH_STACK, &template).await.unwrap());
                }
                BootstrapStep::Complete => break,
            }
        }
        steps
    }
}

// =============================================================================
// Two-phase loop
// =============================================================================

#[tokio::test]
async fn test_bootstrap_converges_in_three_deployments() {
    let mut accounts = Accounts::new();
    let mut state = BootstrapState::default();

    let steps = accounts.bootstrap(&mut state).await;
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0], BootstrapStep::DeployIngestion);
    assert!(matches!(steps[1], BootstrapStep::DeploySearch { .. }));
    assert!(matches!(steps[2], BootstrapStep::RedeployIngestion { .. }));
    assert_eq!(steps[3], BootstrapStep::Complete);
}

#[tokio::test]
async fn test_endpoint_survives_redeploy() {
    let mut accounts = Accounts::new();
    let mut state = BootstrapState::default();
    accounts.bootstrap(&mut state).await;

    let ingestion_outputs = accounts.ingestion_outputs.unwrap();
    assert_eq!(
        ingestion_outputs.get(VPC_ENDPOINT_ID),
        state.search.vpc_endpoint_id.as_deref()
    );
    assert!(ingestion_outputs.get(VPC_ENDPOINT_ID).unwrap().starts_with("vpce-"));
}

#[tokio::test]
async fn test_identifiers_cross_both_ways() {
    let mut accounts = Accounts::new();
    let mut state = BootstrapState::default();
    accounts.bootstrap(&mut state).await;

    let search_outputs = accounts.search_outputs.clone().unwrap();
    let ingestion_outputs = accounts.ingestion_outputs.clone().unwrap();
    let collection_id = search_outputs.get(COLLECTION_ID).unwrap();
    let role_arn = search_outputs.get(INGESTION_ROLE_ARN).unwrap();

    assert_eq!(ingestion_outputs.get(TARGET_COLLECTION_ID), Some(collection_id));
    assert!(
        ingestion_outputs
            .get(SAMPLE_INGESTION_ROLE)
            .unwrap()
            .starts_with("arn:aws:iam::123456789012:role/IngestionStack-")
    );

    // the network policy names the endpoint the ingestion account created
    let search = accounts.search.stack(SEARCH_STACK).await.unwrap();
    let network: Value = serde_json::from_str(
        search.resources["NetworkPolicy"].properties["Policy"]
            .as_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        network[0]["SourceVPCEs"][0].as_str(),
        ingestion_outputs.get(VPC_ENDPOINT_ID)
    );

    // the execution role may assume exactly the published role
    let ingestion = accounts.ingestion.stack(INGESTION_STACK).await.unwrap();
    let policies = &ingestion.resources[EXECUTION_ROLE_ID].properties["Policies"];
    assert_eq!(
        policies[0]["PolicyDocument"]["Statement"][0]["Resource"][0].as_str(),
        Some(role_arn)
    );
}

#[tokio::test]
async fn test_function_environment_resolves_to_collection_endpoint() {
    let mut accounts = Accounts::new();
    let mut state = BootstrapState::default();
    accounts.bootstrap(&mut state).await;

    let search_outputs = accounts.search_outputs.clone().unwrap();
    let ingestion = accounts.ingestion.stack(INGESTION_STACK).await.unwrap();
    let variables = &ingestion.resources[FUNCTION_ID].properties["Environment"]["Variables"];
    let variable = |name: &str| variables[name].as_str().map(str::to_string);

    let config = IngestOptions {
        region: variable("AOSS_REGION"),
        collection_id: variable("AOSS_COLLECTION_ID"),
        role_arn: variable("INGESTION_ROLE_ARN"),
        external_id: variable("INGESTION_ROLE_EXTERNAL_ID"),
        index_name: variable("AOSS_INDEX_NAME").unwrap(),
        ..IngestOptions::default()
    }
    .resolve()
    .unwrap();

    assert_eq!(
        Some(config.endpoint.as_str()),
        search_outputs.get(COLLECTION_ENDPOINT)
    );
    assert_eq!(Some(config.role_arn.as_str()), search_outputs.get(INGESTION_ROLE_ARN));
    assert_eq!(config.index_name, state.search.index_name);
}

#[tokio::test]
async fn test_pending_function_cannot_start() {
    let mut accounts = Accounts::new();
    let mut state = BootstrapState::default();
    let step = reconcile(&mut state, None, None).unwrap();
    assert_eq!(step, BootstrapStep::DeployIngestion);

    let code = CodeLocation::new("artifacts", "aoss-ingestion/bootstrap.zip");
    let template = IngestionStack::synth(&state.ingestion, &code).unwrap();
    accounts.ingestion_outputs = Some(
        accounts
            .ingestion
            .deploy(INGESTION_STACK, &template)
            .await
            .unwrap(),
    );

    let ingestion = accounts.ingestion.stack(INGESTION_STACK).await.unwrap();
    let variables = &ingestion.resources[FUNCTION_ID].properties["Environment"]["Variables"];
    let options = IngestOptions {
        region: variables["AOSS_REGION"].as_str().map(str::to_string),
        collection_id: variables["AOSS_COLLECTION_ID"].as_str().map(str::to_string),
        role_arn: variables["INGESTION_ROLE_ARN"].as_str().map(str::to_string),
        external_id: variables["INGESTION_ROLE_EXTERNAL_ID"]
            .as_str()
            .map(str::to_string),
        ..IngestOptions::default()
    };
    assert!(options.resolve().is_err());
}
