// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use aoss_provisioning::outputs::{
    ALLOWED_VPC_ENDPOINT_ID, COLLECTION_ENDPOINT, COLLECTION_ID, INGESTION_ROLE_ARN,
};
use aoss_provisioning::parameters::SearchParameters;
use aoss_provisioning::template::{Template, get_att};
use validator::Validate;

use crate::collection::Collection;
use crate::constants::{self, INGESTION_ROLE_ID};
use crate::errors::PolicyError;
use crate::policy::AccessPolicySet;
use crate::role::TrustedRole;

const DESCRIPTION: &str = "OpenSearch Serverless collection writable from a trusted account";

/// Search account unit: trusted role, policy set and collection.
pub struct SearchStack;

impl SearchStack {
    /// Builds the template. Fails before anything is submitted when a name
    /// breaks the service grammar or no endpoint is known yet.
    #[tracing::instrument(skip_all, fields(collection = %parameters.collection_name))]
    pub fn synth(parameters: &SearchParameters) -> Result<Template, PolicyError> {
        if parameters.external_id.trim().is_empty() {
            return Err(PolicyError::EmptyExternalId);
        }
        let vpc_endpoint_id = match parameters.vpc_endpoint_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(PolicyError::EmptyEndpoint),
        };
        parameters.validate()?;

        let role = TrustedRole::new(
            &parameters.collection_name,
            &parameters.other_account_id,
            &parameters.external_id,
        )?;
        let policies = AccessPolicySet::new(
            &parameters.collection_name,
            &parameters.index_name,
            vpc_endpoint_id,
            &TrustedRole::arn(),
        )?;
        let collection = Collection::governed_by(&policies);

        let mut template = Template::new(Some(DESCRIPTION));
        template.add_resource(INGESTION_ROLE_ID, role.to_resource()?)?;
        policies.add_to(&mut template)?;
        template.add_resource(constants::COLLECTION_ID, collection.to_resource())?;

        template.add_output(
            COLLECTION_ID,
            get_att(constants::COLLECTION_ID, "Id"),
            Some("OpenSearch Serverless collection id".to_string()),
        );
        template.add_output(
            COLLECTION_ENDPOINT,
            get_att(constants::COLLECTION_ID, "CollectionEndpoint"),
            None,
        );
        template.add_output(
            INGESTION_ROLE_ARN,
            get_att(INGESTION_ROLE_ID, "Arn"),
            Some("Role assumed by the ingestion account".to_string()),
        );
        template.add_output(
            ALLOWED_VPC_ENDPOINT_ID,
            vpc_endpoint_id,
            Some("VPC endpoint the network policy allows".to_string()),
        );
        template.validate()?;

        tracing::info!(
            "[search] synthesized {} resources for endpoint {}",
            template.resources.len(),
            vpc_endpoint_id
        );

        Ok(template)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aoss_provisioning::provisioner::creation_order;
    use serde_json::{Value, json};

    fn parameters() -> SearchParameters {
        SearchParameters {
            collection_name: "my-collection".to_string(),
            index_name: "user-data".to_string(),
            other_account_id: "123456789012".to_string(),
            external_id: "opensearch".to_string(),
            vpc_endpoint_id: Some("vpce-abc123".to_string()),
        }
    }

    #[test]
    fn test_sample_configuration() {
        let template = SearchStack::synth(&parameters()).unwrap();

        let network = template.resource("NetworkPolicy").unwrap();
        let document: Value =
            serde_json::from_str(network.property("Policy").unwrap().as_str().unwrap()).unwrap();
        assert_eq!(document[0]["SourceVPCEs"], json!(["vpce-abc123"]));
        assert_eq!(document[0]["AllowFromPublic"], json!(false));

        let role = template.resource("IngestionRole").unwrap();
        let trust = &role.property("AssumeRolePolicyDocument").unwrap()["Statement"][0];
        assert_eq!(
            trust["Condition"]["StringEquals"]["sts:ExternalId"],
            json!("opensearch")
        );
        assert_eq!(
            trust["Principal"]["AWS"],
            json!("arn:aws:iam::123456789012:root")
        );
    }

    #[test]
    fn test_policies_created_before_collection() {
        let template = SearchStack::synth(&parameters()).unwrap();
        let order = creation_order(&template).unwrap();
        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        for policy in ["EncryptionPolicy", "NetworkPolicy", "AccessPolicy"] {
            assert!(position(policy) < position("Collection"));
        }
        // the access policy names the role, so the role comes first
        assert!(position("IngestionRole") < position("AccessPolicy"));
    }

    #[test]
    fn test_outputs() {
        let template = SearchStack::synth(&parameters()).unwrap();
        assert_eq!(
            template.outputs[COLLECTION_ID].value,
            json!({ "Fn::GetAtt": ["Collection", "Id"] })
        );
        assert_eq!(
            template.outputs[INGESTION_ROLE_ARN].value,
            json!({ "Fn::GetAtt": ["IngestionRole", "Arn"] })
        );
        assert!(template.outputs.contains_key(COLLECTION_ENDPOINT));
        assert_eq!(
            template.outputs[ALLOWED_VPC_ENDPOINT_ID].value,
            json!("vpce-abc123")
        );
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let mut parameters = parameters();
        parameters.vpc_endpoint_id = None;
        assert_eq!(SearchStack::synth(&parameters), Err(PolicyError::EmptyEndpoint));
        parameters.vpc_endpoint_id = Some(String::new());
        assert_eq!(SearchStack::synth(&parameters), Err(PolicyError::EmptyEndpoint));
    }

    #[test]
    fn test_empty_external_id_rejected() {
        let mut parameters = parameters();
        parameters.external_id = String::new();
        assert_eq!(SearchStack::synth(&parameters), Err(PolicyError::EmptyExternalId));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut parameters = parameters();
        parameters.collection_name = "Bad_Name".to_string();
        assert!(matches!(
            SearchStack::synth(&parameters),
            Err(PolicyError::InvalidParameters(_))
        ));
    }
}
