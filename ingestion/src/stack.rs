// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use aoss_provisioning::errors::ProvisionError;
use aoss_provisioning::outputs::{SAMPLE_INGESTION_ROLE, TARGET_COLLECTION_ID, VPC_ENDPOINT_ID};
use aoss_provisioning::parameters::IngestionParameters;
use aoss_provisioning::template::{Template, get_att};
use validator::Validate;

use crate::execution::{CodeLocation, EXECUTION_ROLE_ID, ExecutionRole, FUNCTION_ID, function_resource};
use crate::network::{AOSS_ENDPOINT_ID, NetworkBoundary};

const DESCRIPTION: &str = "Private network and ingestion function writing to a collection in another account";

/// Ingestion account unit: network boundary, endpoints and function.
pub struct IngestionStack;

impl IngestionStack {
    /// Builds the template. Deploys in pending form while the collection id
    /// and role ARN are still unknown.
    #[tracing::instrument(skip_all, fields(region = %parameters.region))]
    pub fn synth(
        parameters: &IngestionParameters,
        code: &CodeLocation,
    ) -> Result<Template, ProvisionError> {
        parameters.validate()?;
        if code.bucket.trim().is_empty() || code.key.trim().is_empty() {
            return Err(ProvisionError::InvalidParameters(
                "function code location is incomplete".to_string(),
            ));
        }

        let network = NetworkBoundary::default();
        let mut template = Template::new(Some(DESCRIPTION));
        network.add_to(&mut template)?;

        let role = ExecutionRole::new(parameters.ingestion_role_arn.as_deref());
        template.add_resource(EXECUTION_ROLE_ID, role.to_resource()?)?;
        template.add_resource(FUNCTION_ID, function_resource(parameters, code, &network))?;

        template.add_output(
            VPC_ENDPOINT_ID,
            get_att(AOSS_ENDPOINT_ID, "Id"),
            Some("OpenSearch Serverless VPC endpoint id".to_string()),
        );
        template.add_output(
            SAMPLE_INGESTION_ROLE,
            get_att(EXECUTION_ROLE_ID, "Arn"),
            None,
        );
        template.add_output(
            TARGET_COLLECTION_ID,
            parameters.collection_id.clone().unwrap_or_default(),
            None,
        );
        template.validate()?;

        if parameters.collection_id.is_none() || parameters.ingestion_role_arn.is_none() {
            tracing::info!("[ingestion] synthesized pending stack, collection not known yet");
        } else {
            tracing::info!(
                "[ingestion] synthesized {} resources targeting {}",
                template.resources.len(),
                parameters.collection_id.as_deref().unwrap_or_default()
            );
        }

        Ok(template)
    }
}
