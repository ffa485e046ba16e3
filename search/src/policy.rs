// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! OpenSearch Serverless security policies.
//!
//! A collection is governed by exactly one policy of each kind:
//!
//! | Kind | Service type | Decides |
//! |------|--------------|---------|
//! | [`EncryptionPolicy`] | `encryption` | which key encrypts the collection |
//! | [`NetworkPolicy`] | `network` | which endpoints may reach the collection |
//! | [`DataAccessPolicy`] | `data` | which principal may do what on which path |
//!
//! [`AccessPolicySet`] builds the three for one collection and one index. Every
//! resource path it emits names that collection (and index) literally; names
//! are checked against the service grammar, which has no wildcard characters.

use std::collections::BTreeSet;

use aoss_provisioning::parameters::{
    is_valid_collection_name, is_valid_index_name, is_valid_vpc_endpoint_id,
};
use aoss_provisioning::template::{Resource, Template, interpolate};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ACCESS_POLICY_DESCRIPTION, ACCESS_POLICY_ID, ACCESS_POLICY_TYPE, ENCRYPTION_POLICY_ID,
    NETWORK_POLICY_ID, SECURITY_POLICY_TYPE,
};
use crate::errors::PolicyError;

/// Policy names are limited to 32 characters by the service.
pub const MAX_POLICY_NAME_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Collection,
    Index,
}

pub fn collection_path(collection: &str) -> String {
    format!("collection/{collection}")
}

pub fn index_path(collection: &str, index: &str) -> String {
    format!("index/{collection}/{index}")
}

/// Data-plane permissions. The serialized names form the authorization
/// contract with the service and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "aoss:CreateCollectionItems")]
    CreateCollectionItems,
    #[serde(rename = "aoss:DeleteCollectionItems")]
    DeleteCollectionItems,
    #[serde(rename = "aoss:UpdateCollectionItems")]
    UpdateCollectionItems,
    #[serde(rename = "aoss:DescribeCollectionItems")]
    DescribeCollectionItems,
    #[serde(rename = "aoss:CreateIndex")]
    CreateIndex,
    #[serde(rename = "aoss:DeleteIndex")]
    DeleteIndex,
    #[serde(rename = "aoss:UpdateIndex")]
    UpdateIndex,
    #[serde(rename = "aoss:DescribeIndex")]
    DescribeIndex,
    #[serde(rename = "aoss:ReadDocument")]
    ReadDocument,
    #[serde(rename = "aoss:WriteDocument")]
    WriteDocument,
}

impl Permission {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::CreateCollectionItems
            | Self::DeleteCollectionItems
            | Self::UpdateCollectionItems
            | Self::DescribeCollectionItems => ResourceType::Collection,
            _ => ResourceType::Index,
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DeleteCollectionItems | Self::DeleteIndex)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Encryption,
    Network,
    Data,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encryption => "encryption",
            Self::Network => "network",
            Self::Data => "data",
        }
    }

    fn name_suffix(&self) -> &'static str {
        match self {
            Self::Encryption => "encryption",
            Self::Network => "network",
            Self::Data => "access",
        }
    }

    /// `{collection}-encryption`, `{collection}-network`, `{collection}-access`
    pub fn policy_name(&self, collection: &str) -> String {
        format!("{collection}-{}", self.name_suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRule {
    #[serde(rename = "ResourceType")]
    pub resource_type: ResourceType,
    #[serde(rename = "Resource")]
    pub resource: Vec<String>,
}

impl ScopeRule {
    pub fn collection(collection: &str) -> Self {
        Self {
            resource_type: ResourceType::Collection,
            resource: vec![collection_path(collection)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyManagement {
    AwsOwned,
    CustomerManaged { kms_key_arn: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDocument {
    #[serde(rename = "Rules")]
    pub rules: Vec<ScopeRule>,
    #[serde(rename = "AWSOwnedKey")]
    pub aws_owned_key: bool,
    #[serde(rename = "KmsARN", default, skip_serializing_if = "Option::is_none")]
    pub kms_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionPolicy {
    name: String,
    document: EncryptionDocument,
}

impl EncryptionPolicy {
    pub fn for_collection(collection: &str, keys: KeyManagement) -> Self {
        let (aws_owned_key, kms_arn) = match keys {
            KeyManagement::AwsOwned => (true, None),
            KeyManagement::CustomerManaged { kms_key_arn } => (false, Some(kms_key_arn)),
        };
        Self {
            name: PolicyType::Encryption.policy_name(collection),
            document: EncryptionDocument {
                rules: vec![ScopeRule::collection(collection)],
                aws_owned_key,
                kms_arn,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &EncryptionDocument {
        &self.document
    }

    pub fn key_management(&self) -> KeyManagement {
        match (&self.document.aws_owned_key, &self.document.kms_arn) {
            (false, Some(arn)) => KeyManagement::CustomerManaged {
                kms_key_arn: arn.clone(),
            },
            _ => KeyManagement::AwsOwned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatement {
    #[serde(rename = "Rules")]
    pub rules: Vec<ScopeRule>,
    #[serde(rename = "AllowFromPublic")]
    pub allow_from_public: bool,
    #[serde(rename = "SourceVPCEs", default, skip_serializing_if = "Vec::is_empty")]
    pub source_vpces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPolicy {
    name: String,
    statements: Vec<NetworkStatement>,
}

impl NetworkPolicy {
    /// Private access from exactly one VPC endpoint. An empty or malformed
    /// endpoint id is rejected: with public access off it would leave the
    /// collection reachable from nowhere.
    pub fn private(collection: &str, vpc_endpoint_id: &str) -> Result<Self, PolicyError> {
        let vpc_endpoint_id = vpc_endpoint_id.trim();
        if vpc_endpoint_id.is_empty() {
            return Err(PolicyError::EmptyEndpoint);
        }
        if !is_valid_vpc_endpoint_id(vpc_endpoint_id) {
            return Err(PolicyError::InvalidEndpoint(vpc_endpoint_id.to_string()));
        }

        Ok(Self {
            name: PolicyType::Network.policy_name(collection),
            statements: vec![NetworkStatement {
                rules: vec![ScopeRule::collection(collection)],
                allow_from_public: false,
                source_vpces: vec![vpc_endpoint_id.to_string()],
            }],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statements(&self) -> &[NetworkStatement] {
        &self.statements
    }

    pub fn allow_from_public(&self) -> bool {
        self.statements.iter().any(|s| s.allow_from_public)
    }

    pub fn source_vpces(&self) -> Vec<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.source_vpces.iter().map(String::as_str))
            .collect()
    }

    /// Whether traffic arriving through `vpc_endpoint_id` may reach the collection.
    /// The empty id never matches.
    pub fn admits(&self, vpc_endpoint_id: &str) -> bool {
        !vpc_endpoint_id.is_empty()
            && self.statements.iter().any(|s| {
                s.allow_from_public || s.source_vpces.iter().any(|id| id == vpc_endpoint_id)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    #[serde(rename = "Resource")]
    pub resource: Vec<String>,
    #[serde(rename = "Permission")]
    pub permission: Vec<Permission>,
    #[serde(rename = "ResourceType")]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessStatement {
    #[serde(rename = "Rules")]
    pub rules: Vec<PermissionRule>,
    #[serde(rename = "Principal")]
    pub principal: Vec<String>,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAccessPolicy {
    name: String,
    statements: Vec<DataAccessStatement>,
}

/// Collects rules for one principal on one collection. Destructive permissions
/// and permissions granted on the wrong resource type are refused.
#[derive(Debug, Clone)]
pub struct DataAccessPolicyBuilder {
    collection: String,
    principals: Vec<String>,
    description: String,
    rules: Vec<PermissionRule>,
}

impl DataAccessPolicyBuilder {
    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principals.push(principal.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn grant_collection(self, permissions: &[Permission]) -> Result<Self, PolicyError> {
        let path = collection_path(&self.collection);
        self.grant(ResourceType::Collection, path, permissions)
    }

    pub fn grant_index(self, index: &str, permissions: &[Permission]) -> Result<Self, PolicyError> {
        if !is_valid_index_name(index) {
            return Err(PolicyError::InvalidIndexName(index.to_string()));
        }
        let path = index_path(&self.collection, index);
        self.grant(ResourceType::Index, path, permissions)
    }

    fn grant(
        mut self,
        resource_type: ResourceType,
        path: String,
        permissions: &[Permission],
    ) -> Result<Self, PolicyError> {
        for permission in permissions {
            if permission.is_destructive() {
                return Err(PolicyError::DestructivePermission(*permission));
            }
            if permission.resource_type() != resource_type {
                return Err(PolicyError::PermissionScope {
                    permission: *permission,
                    resource: path,
                });
            }
        }
        self.rules.push(PermissionRule {
            resource: vec![path],
            permission: permissions.to_vec(),
            resource_type,
        });
        Ok(self)
    }

    pub fn build(self) -> Result<DataAccessPolicy, PolicyError> {
        let principals: Vec<String> = self
            .principals
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if principals.len() != 1 {
            return Err(PolicyError::PrincipalCount(principals.len()));
        }
        Ok(DataAccessPolicy {
            name: PolicyType::Data.policy_name(&self.collection),
            statements: vec![DataAccessStatement {
                rules: self.rules,
                principal: principals,
                description: self.description,
            }],
        })
    }
}

impl DataAccessPolicy {
    pub fn builder(collection: &str) -> DataAccessPolicyBuilder {
        DataAccessPolicyBuilder {
            collection: collection.to_string(),
            principals: Vec::new(),
            description: String::new(),
            rules: Vec::new(),
        }
    }

    /// Item creation on the collection, and write plus index management short
    /// of deletion on one index, for a single principal.
    pub fn ingestion(collection: &str, index: &str, principal: &str) -> Result<Self, PolicyError> {
        Self::builder(collection)
            .principal(principal)
            .description(ACCESS_POLICY_DESCRIPTION)
            .grant_collection(&[Permission::CreateCollectionItems])?
            .grant_index(
                index,
                &[
                    Permission::WriteDocument,
                    Permission::CreateIndex,
                    Permission::UpdateIndex,
                    Permission::DescribeIndex,
                ],
            )?
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statements(&self) -> &[DataAccessStatement] {
        &self.statements
    }

    pub fn principals(&self) -> Vec<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.principal.iter().map(String::as_str))
            .collect()
    }

    pub fn resource_paths(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.rules.iter())
            .flat_map(|r| r.resource.iter().map(String::as_str))
            .collect()
    }

    pub fn permissions_on(&self, path: &str) -> BTreeSet<Permission> {
        self.statements
            .iter()
            .flat_map(|s| s.rules.iter())
            .filter(|r| r.resource.iter().any(|p| p == path))
            .flat_map(|r| r.permission.iter().copied())
            .collect()
    }

    pub fn grants(&self, principal: &str, path: &str, permission: Permission) -> bool {
        self.statements.iter().any(|s| {
            s.principal.iter().any(|p| p == principal)
                && s.rules.iter().any(|r| {
                    r.resource.iter().any(|p| p == path) && r.permission.contains(&permission)
                })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityPolicy {
    Encryption(EncryptionPolicy),
    Network(NetworkPolicy),
    DataAccess(DataAccessPolicy),
}

impl SecurityPolicy {
    pub fn name(&self) -> &str {
        match self {
            Self::Encryption(p) => p.name(),
            Self::Network(p) => p.name(),
            Self::DataAccess(p) => p.name(),
        }
    }

    pub fn policy_type(&self) -> PolicyType {
        match self {
            Self::Encryption(_) => PolicyType::Encryption,
            Self::Network(_) => PolicyType::Network,
            Self::DataAccess(_) => PolicyType::Data,
        }
    }

    pub fn logical_id(&self) -> &'static str {
        match self {
            Self::Encryption(_) => ENCRYPTION_POLICY_ID,
            Self::Network(_) => NETWORK_POLICY_ID,
            Self::DataAccess(_) => ACCESS_POLICY_ID,
        }
    }

    /// The policy text submitted to the service.
    pub fn document(&self) -> Result<String, PolicyError> {
        let document = match self {
            Self::Encryption(p) => serde_json::to_string(p.document())?,
            Self::Network(p) => serde_json::to_string(p.statements())?,
            Self::DataAccess(p) => serde_json::to_string(p.statements())?,
        };
        Ok(document)
    }

    /// Every (resource type, resource path) pair the policy governs.
    pub fn resource_scope(&self) -> BTreeSet<(ResourceType, String)> {
        let pairs = |rules: &[ScopeRule]| -> Vec<(ResourceType, String)> {
            rules
                .iter()
                .flat_map(|r| r.resource.iter().map(|p| (r.resource_type, p.clone())))
                .collect()
        };
        match self {
            Self::Encryption(p) => pairs(&p.document().rules).into_iter().collect(),
            Self::Network(p) => p
                .statements()
                .iter()
                .flat_map(|s| pairs(&s.rules))
                .collect(),
            Self::DataAccess(p) => p
                .statements()
                .iter()
                .flat_map(|s| s.rules.iter())
                .flat_map(|r| r.resource.iter().map(|path| (r.resource_type, path.clone())))
                .collect(),
        }
    }

    pub fn to_resource(&self) -> Result<Resource, PolicyError> {
        let policy = interpolate(self.document()?);
        let resource = match self {
            Self::DataAccess(_) => Resource::new(ACCESS_POLICY_TYPE)
                .with_property("Description", ACCESS_POLICY_DESCRIPTION),
            _ => Resource::new(SECURITY_POLICY_TYPE),
        };
        Ok(resource
            .with_property("Name", self.name())
            .with_property("Type", self.policy_type().as_str())
            .with_property("Policy", policy))
    }
}

/// The three policies governing one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicySet {
    collection_name: String,
    index_name: String,
    encryption: EncryptionPolicy,
    network: NetworkPolicy,
    data_access: DataAccessPolicy,
}

impl AccessPolicySet {
    pub fn new(
        collection_name: &str,
        index_name: &str,
        vpc_endpoint_id: &str,
        principal: &str,
    ) -> Result<Self, PolicyError> {
        if !is_valid_collection_name(collection_name) {
            return Err(PolicyError::InvalidCollectionName(collection_name.to_string()));
        }
        if !is_valid_index_name(index_name) {
            return Err(PolicyError::InvalidIndexName(index_name.to_string()));
        }
        for policy_type in [PolicyType::Encryption, PolicyType::Network, PolicyType::Data] {
            if policy_type.policy_name(collection_name).len() > MAX_POLICY_NAME_LENGTH {
                return Err(PolicyError::InvalidCollectionName(collection_name.to_string()));
            }
        }

        Ok(Self {
            collection_name: collection_name.to_string(),
            index_name: index_name.to_string(),
            encryption: EncryptionPolicy::for_collection(collection_name, KeyManagement::AwsOwned),
            network: NetworkPolicy::private(collection_name, vpc_endpoint_id)?,
            data_access: DataAccessPolicy::ingestion(collection_name, index_name, principal)?,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn encryption(&self) -> &EncryptionPolicy {
        &self.encryption
    }

    pub fn network(&self) -> &NetworkPolicy {
        &self.network
    }

    pub fn data_access(&self) -> &DataAccessPolicy {
        &self.data_access
    }

    pub fn members(&self) -> [SecurityPolicy; 3] {
        [
            SecurityPolicy::Encryption(self.encryption.clone()),
            SecurityPolicy::Network(self.network.clone()),
            SecurityPolicy::DataAccess(self.data_access.clone()),
        ]
    }

    pub fn logical_ids(&self) -> [&'static str; 3] {
        [ENCRYPTION_POLICY_ID, NETWORK_POLICY_ID, ACCESS_POLICY_ID]
    }

    pub fn add_to(&self, template: &mut Template) -> Result<(), PolicyError> {
        for policy in self.members() {
            template.add_resource(policy.logical_id(), policy.to_resource()?)?;
        }
        Ok(())
    }
}
