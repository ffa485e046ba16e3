// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Declarative resource descriptions handed to the provisioning substrate.
//!
//! A [`Template`] is rendered in the CloudFormation JSON shape:
//!
//! ```json
//! {
//!   "AWSTemplateFormatVersion": "2010-09-09",
//!   "Resources": { "<LogicalId>": { "Type": "...", "Properties": {}, "DependsOn": [] } },
//!   "Outputs": { "<Key>": { "Value": "...", "Description": "..." } }
//! }
//! ```
//!
//! Values that only exist after deployment (generated ids, ARNs) are expressed
//! with the intrinsics built by [`get_att`], [`reference`] and [`sub`]. The
//! dependency set of a resource is the union of its explicit `DependsOn` list
//! and every resource its properties reference.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::errors::ProvisionError;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(rename = "DependsOn", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Logical ids referenced from the properties of this resource.
    pub fn references(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for value in self.properties.values() {
            collect_references(value, &mut found);
        }
        found
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "Value")]
    pub value: Value,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new(None::<String>)
    }
}

impl Template {
    pub fn new(description: Option<impl Into<String>>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: description.map(Into::into),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
    ) -> Result<(), ProvisionError> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(ProvisionError::DuplicateResource(logical_id));
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Records that `logical_id` must only be created after `depends_on`.
    pub fn add_dependency(&mut self, logical_id: &str, depends_on: &str) -> Result<(), ProvisionError> {
        if !self.resources.contains_key(depends_on) {
            return Err(ProvisionError::UnknownResource(depends_on.to_string()));
        }
        let resource = self
            .resources
            .get_mut(logical_id)
            .ok_or_else(|| ProvisionError::UnknownResource(logical_id.to_string()))?;
        if logical_id != depends_on {
            resource.depends_on.insert(depends_on.to_string());
        }
        Ok(())
    }

    pub fn add_output(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        description: Option<String>,
    ) {
        self.outputs.insert(
            key.into(),
            Output {
                value: value.into(),
                description,
            },
        );
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Explicit and implicit dependencies of a resource.
    pub fn dependencies_of(&self, logical_id: &str) -> BTreeSet<String> {
        match self.resources.get(logical_id) {
            Some(resource) => {
                let mut dependencies = resource.references();
                dependencies.extend(resource.depends_on.iter().cloned());
                dependencies
            }
            None => BTreeSet::new(),
        }
    }

    /// Checks that every reference and explicit dependency resolves to a resource
    /// declared in this template.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        for logical_id in self.resources.keys() {
            for target in self.dependencies_of(logical_id) {
                if !self.resources.contains_key(&target) {
                    return Err(ProvisionError::UnknownReference {
                        resource: logical_id.clone(),
                        target,
                    });
                }
            }
        }
        for (key, output) in &self.outputs {
            let mut found = BTreeSet::new();
            collect_references(&output.value, &mut found);
            if let Some(target) = found.into_iter().find(|t| !self.resources.contains_key(t)) {
                return Err(ProvisionError::UnknownReference {
                    resource: key.clone(),
                    target,
                });
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, ProvisionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Ref": logical_id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::Sub": text}`
pub fn sub(text: impl Into<String>) -> Value {
    json!({ "Fn::Sub": text.into() })
}

/// `${logical_id.attribute}`, for embedding a late-bound attribute in a string
/// that is later wrapped with [`interpolate`].
pub fn placeholder(logical_id: &str, attribute: &str) -> String {
    format!("${{{logical_id}.{attribute}}}")
}

/// Wraps `text` in `Fn::Sub` only when it carries placeholders.
pub fn interpolate(text: String) -> Value {
    if placeholders(&text).is_empty() {
        Value::String(text)
    } else {
        sub(text)
    }
}

/// `{"Fn::Select": [index, {"Fn::GetAZs": ""}]}`
pub fn availability_zone(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

/// Placeholder names (`Logical` or `Logical.Attr`) found in a `Fn::Sub` string.
/// Escaped placeholders (`${!Literal}`) are skipped.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.starts_with('!') && !name.is_empty() {
                    found.push(name.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    found
}

/// Renders a `Fn::Sub` string, asking `value` for each placeholder.
/// `${!Literal}` renders as `${Literal}`; an unterminated `${` is kept as is.
pub fn render_sub<E>(
    text: &str,
    mut value: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            rest = &rest[start..];
            break;
        };
        let name = &after[..end];
        match name.strip_prefix('!') {
            Some(literal) => {
                rendered.push_str("${");
                rendered.push_str(literal);
                rendered.push('}');
            }
            None if name.is_empty() => rendered.push_str("${}"),
            None => rendered.push_str(&value(name)?),
        }
        rest = &after[end + 1..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

fn placeholder_target(name: &str) -> Option<String> {
    if name.starts_with(PSEUDO_PARAMETER_PREFIX) {
        return None;
    }
    let target = name.split('.').next().unwrap_or(name);
    Some(target.to_string())
}

/// Collects the logical ids referenced by intrinsics anywhere in `value`.
pub fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with(PSEUDO_PARAMETER_PREFIX) {
                    found.insert(target.clone());
                }
                return;
            }
            if let Some(attribute) = map.get("Fn::GetAtt") {
                match attribute {
                    Value::Array(parts) => {
                        if let Some(Value::String(target)) = parts.first() {
                            found.insert(target.clone());
                        }
                    }
                    Value::String(dotted) => {
                        found.extend(placeholder_target(dotted));
                    }
                    _ => {}
                }
                return;
            }
            if let Some(text) = map.get("Fn::Sub") {
                let (text, variables) = match text {
                    Value::String(text) => (text.as_str(), None),
                    Value::Array(parts) => match (parts.first(), parts.get(1)) {
                        (Some(Value::String(text)), variables) => (text.as_str(), variables),
                        _ => return,
                    },
                    _ => return,
                };
                let local: BTreeSet<&str> = variables
                    .and_then(Value::as_object)
                    .map(|vars| vars.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                for name in placeholders(text) {
                    if !local.contains(name.as_str()) {
                        found.extend(placeholder_target(&name));
                    }
                }
                if let Some(variables) = variables {
                    collect_references(variables, found);
                }
                return;
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}
