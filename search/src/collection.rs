// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use aoss_provisioning::template::Resource;

use crate::constants::{COLLECTION_RESOURCE_TYPE, COLLECTION_TYPE};
use crate::policy::AccessPolicySet;

/// A search collection. It can only be created once its encryption, network
/// and data-access policies exist, so it depends on every member of the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    name: String,
    depends_on: [&'static str; 3],
}

impl Collection {
    pub fn governed_by(policies: &AccessPolicySet) -> Self {
        Self {
            name: policies.collection_name().to_string(),
            depends_on: policies.logical_ids(),
        }
    }

    pub fn to_resource(&self) -> Resource {
        let mut resource = Resource::new(COLLECTION_RESOURCE_TYPE)
            .with_property("Name", self.name.as_str())
            .with_property("Type", COLLECTION_TYPE);
        resource
            .depends_on
            .extend(self.depends_on.iter().map(|id| id.to_string()));
        resource
    }
}
