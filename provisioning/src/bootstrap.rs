// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Two-phase bootstrap between the ingestion and search units.
//!
//! Each unit needs an identifier that only exists once the other unit has been
//! deployed, so neither can be deployed in final form first:
//!
//! ```text
//! 1. deploy IngestionStack (pending: no collection id, no role ARN)  -> VpcEndpointId
//! 2. deploy SearchStack with VpcEndpointId                           -> CollectionId, IngestionRoleArn
//! 3. redeploy IngestionStack with CollectionId + IngestionRoleArn
//! ```
//!
//! [`reconcile`] is one pass of that loop: it reads whatever outputs exist,
//! copies them into the [`BootstrapState`] and names the next deployment. It
//! never talks to either unit directly.

use std::fmt;

use crate::errors::BootstrapError;
use crate::outputs::{
    ALLOWED_VPC_ENDPOINT_ID, COLLECTION_ID, INGESTION_ROLE_ARN, INGESTION_STACK, SEARCH_STACK, StackOutputs,
    TARGET_COLLECTION_ID, VPC_ENDPOINT_ID,
};
use crate::parameters::BootstrapState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapStep {
    /// Phase 1: the ingestion unit has not produced an endpoint id yet.
    DeployIngestion,
    /// Phase 2: the network policy can now name the endpoint.
    DeploySearch { vpc_endpoint_id: String },
    /// Phase 3: close the loop by handing the collection and role back.
    RedeployIngestion {
        collection_id: String,
        ingestion_role_arn: String,
    },
    Complete,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeployIngestion => write!(f, "deploy {INGESTION_STACK}"),
            Self::DeploySearch { vpc_endpoint_id } => {
                write!(f, "deploy {SEARCH_STACK} allowing endpoint {vpc_endpoint_id}")
            }
            Self::RedeployIngestion {
                collection_id,
                ingestion_role_arn,
            } => write!(
                f,
                "redeploy {INGESTION_STACK} targeting collection {collection_id} as {ingestion_role_arn}"
            ),
            Self::Complete => write!(f, "bootstrap complete"),
        }
    }
}

/// One reconciliation pass. Mutates `state` with any identifiers newly learned
/// from the outputs and returns the deployment that has to happen next.
#[tracing::instrument(skip_all)]
pub fn reconcile(
    state: &mut BootstrapState,
    ingestion_outputs: Option<&StackOutputs>,
    search_outputs: Option<&StackOutputs>,
) -> Result<BootstrapStep, BootstrapError> {
    state.check()?;

    if state.uses_placeholder_external_id() {
        tracing::warn!("[bootstrap] the sample external id is in use, replace it before a real deployment");
    }

    let Some(ingestion_outputs) = ingestion_outputs else {
        return Ok(BootstrapStep::DeployIngestion);
    };

    let vpc_endpoint_id = ingestion_outputs
        .require(INGESTION_STACK, VPC_ENDPOINT_ID)?
        .to_string();
    if state.search.vpc_endpoint_id.as_deref() != Some(vpc_endpoint_id.as_str()) {
        tracing::info!("[bootstrap] learned endpoint {}", vpc_endpoint_id);
        state.search.vpc_endpoint_id = Some(vpc_endpoint_id.clone());
        return Ok(BootstrapStep::DeploySearch { vpc_endpoint_id });
    }

    let Some(search_outputs) = search_outputs else {
        return Ok(BootstrapStep::DeploySearch { vpc_endpoint_id });
    };

    // the search unit echoes the endpoint its network policy allows
    if search_outputs.get(ALLOWED_VPC_ENDPOINT_ID) != Some(vpc_endpoint_id.as_str()) {
        return Ok(BootstrapStep::DeploySearch { vpc_endpoint_id });
    }

    let collection_id = search_outputs.require(SEARCH_STACK, COLLECTION_ID)?.to_string();
    let ingestion_role_arn = search_outputs
        .require(SEARCH_STACK, INGESTION_ROLE_ARN)?
        .to_string();

    let learned = state.ingestion.collection_id.as_deref() != Some(collection_id.as_str())
        || state.ingestion.ingestion_role_arn.as_deref() != Some(ingestion_role_arn.as_str());
    if learned {
        tracing::info!(
            "[bootstrap] learned collection {} and role {}",
            collection_id,
            ingestion_role_arn
        );
        state.ingestion.collection_id = Some(collection_id.clone());
        state.ingestion.ingestion_role_arn = Some(ingestion_role_arn.clone());
    }

    // the ingestion unit echoes the collection it was last deployed against
    if learned || ingestion_outputs.get(TARGET_COLLECTION_ID) != Some(collection_id.as_str()) {
        return Ok(BootstrapStep::RedeployIngestion {
            collection_id,
            ingestion_role_arn,
        });
    }

    Ok(BootstrapStep::Complete)
}
