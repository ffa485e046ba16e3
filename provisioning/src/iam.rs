// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! IAM policy documents shared by both stacks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
pub const EXTERNAL_ID_CONDITION_KEY: &str = "sts:ExternalId";
pub const STRING_EQUALS: &str = "StringEquals";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// `{"AWS": "..."}` or `{"Service": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    #[serde(rename = "AWS")]
    Aws(String),
    #[serde(rename = "Service")]
    Service(String),
}

impl Principal {
    /// The root principal of an account, i.e. any identity the account delegates to.
    pub fn account(account_id: &str) -> Self {
        Principal::Aws(format!("arn:aws:iam::{account_id}:root"))
    }
}

pub type Conditions = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Principal", default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(rename = "Action")]
    pub action: Vec<String>,
    #[serde(rename = "Resource", default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<Value>>,
    #[serde(rename = "Condition", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: Conditions,
}

impl Statement {
    pub fn allow(actions: &[&str]) -> Self {
        Self {
            effect: Effect::Allow,
            principal: None,
            action: actions.iter().map(|a| a.to_string()).collect(),
            resource: None,
            condition: BTreeMap::new(),
        }
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn resources(mut self, resources: Vec<Value>) -> Self {
        self.resource = Some(resources);
        self
    }

    pub fn string_equals(mut self, key: &str, value: &str) -> Self {
        self.condition
            .entry(STRING_EQUALS.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Value required by a `StringEquals` condition on `key`, if any.
    pub fn required_value(&self, key: &str) -> Option<&str> {
        self.condition
            .get(STRING_EQUALS)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }
}
