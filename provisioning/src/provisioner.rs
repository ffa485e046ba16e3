// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The provisioning substrate.
//!
//! [`Provisioner`] is the interface both units are deployed through: it accepts
//! a [`Template`] and returns the stack outputs once every resource exists.
//! A deployment either completes entirely or fails without reporting anything
//! as created.
//!
//! [`LocalProvisioner`] is an in-process substrate used for dry runs and tests.
//! It orders resources topologically (explicit `DependsOn` plus implicit
//! references, lexical tie-break), generates identifiers in the formats the
//! real services use, resolves intrinsics, and keeps physical ids stable when
//! a stack is redeployed.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::errors::ProvisionError;
use crate::outputs::StackOutputs;
use crate::template::{Template, render_sub};

pub trait Provisioner {
    fn deploy(
        &self,
        stack_name: &str,
        template: &Template,
    ) -> impl Future<Output = Result<StackOutputs, ProvisionError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeployedResource {
    pub resource_type: String,
    pub physical_id: String,
    pub attributes: BTreeMap<String, String>,
    /// Properties with every intrinsic resolved.
    pub properties: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployedStack {
    pub creation_order: Vec<String>,
    pub resources: BTreeMap<String, DeployedResource>,
    pub outputs: StackOutputs,
}

struct State {
    rng: fastrand::Rng,
    stacks: BTreeMap<String, DeployedStack>,
}

pub struct LocalProvisioner {
    account_id: String,
    region: String,
    state: Mutex<State>,
}

impl LocalProvisioner {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self::with_rng(account_id, region, fastrand::Rng::new())
    }

    /// Deterministic identifiers, for tests.
    pub fn with_seed(account_id: impl Into<String>, region: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(account_id, region, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(account_id: impl Into<String>, region: impl Into<String>, rng: fastrand::Rng) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            state: Mutex::new(State {
                rng,
                stacks: BTreeMap::new(),
            }),
        }
    }

    pub async fn stack(&self, stack_name: &str) -> Option<DeployedStack> {
        self.state.lock().await.stacks.get(stack_name).cloned()
    }

    fn availability_zones(&self) -> Vec<String> {
        ["a", "b", "c"]
            .iter()
            .map(|suffix| format!("{}{}", self.region, suffix))
            .collect()
    }

    fn pseudo_parameter(&self, stack_name: &str, name: &str) -> Option<String> {
        match name {
            "AWS::AccountId" => Some(self.account_id.clone()),
            "AWS::Region" => Some(self.region.clone()),
            "AWS::Partition" => Some("aws".to_string()),
            "AWS::URLSuffix" => Some("amazonaws.com".to_string()),
            "AWS::StackName" => Some(stack_name.to_string()),
            _ => None,
        }
    }

    fn generate(
        &self,
        rng: &mut fastrand::Rng,
        stack_name: &str,
        logical_id: &str,
        resource_type: &str,
    ) -> (String, BTreeMap<String, String>) {
        let account = &self.account_id;
        let region = &self.region;
        let hex = |rng: &mut fastrand::Rng, len: usize| -> String {
            (0..len)
                .map(|_| char::from_digit(rng.u32(0..16), 16).unwrap_or('0'))
                .collect()
        };
        let lower_alnum = |rng: &mut fastrand::Rng, len: usize| -> String {
            (0..len)
                .map(|_| {
                    if rng.bool() {
                        rng.lowercase()
                    } else {
                        rng.digit(10)
                    }
                })
                .collect()
        };

        let mut attributes = BTreeMap::new();
        let physical_id = match resource_type {
            "AWS::OpenSearchServerless::VpcEndpoint" | "AWS::EC2::VPCEndpoint" => {
                let id = format!("vpce-{}", hex(rng, 17));
                attributes.insert("Id".to_string(), id.clone());
                id
            }
            "AWS::OpenSearchServerless::Collection" => {
                let id = lower_alnum(rng, 20);
                attributes.insert("Id".to_string(), id.clone());
                attributes.insert(
                    "Arn".to_string(),
                    format!("arn:aws:aoss:{region}:{account}:collection/{id}"),
                );
                attributes.insert(
                    "CollectionEndpoint".to_string(),
                    format!("https://{id}.{region}.aoss.amazonaws.com"),
                );
                attributes.insert(
                    "DashboardEndpoint".to_string(),
                    format!("https://{id}.{region}.aoss.amazonaws.com/_dashboards"),
                );
                id
            }
            "AWS::IAM::Role" => {
                let suffix = lower_alnum(rng, 12).to_uppercase();
                let name = format!("{stack_name}-{logical_id}-{suffix}");
                attributes.insert(
                    "Arn".to_string(),
                    format!("arn:aws:iam::{account}:role/{name}"),
                );
                attributes.insert("RoleId".to_string(), format!("AROA{}", lower_alnum(rng, 17).to_uppercase()));
                name
            }
            "AWS::EC2::VPC" => {
                let id = format!("vpc-{}", hex(rng, 17));
                attributes.insert("VpcId".to_string(), id.clone());
                id
            }
            "AWS::EC2::Subnet" => {
                let id = format!("subnet-{}", hex(rng, 17));
                attributes.insert("SubnetId".to_string(), id.clone());
                id
            }
            "AWS::EC2::SecurityGroup" => {
                let id = format!("sg-{}", hex(rng, 17));
                attributes.insert("GroupId".to_string(), id.clone());
                id
            }
            "AWS::EC2::InternetGateway" => format!("igw-{}", hex(rng, 17)),
            "AWS::EC2::RouteTable" => format!("rtb-{}", hex(rng, 17)),
            "AWS::Lambda::Function" => {
                let name = format!("{stack_name}-{logical_id}-{}", lower_alnum(rng, 12));
                attributes.insert(
                    "Arn".to_string(),
                    format!("arn:aws:lambda:{region}:{account}:function:{name}"),
                );
                name
            }
            _ => format!("{stack_name}-{logical_id}-{}", lower_alnum(rng, 8)),
        };
        (physical_id, attributes)
    }

    fn resolve(
        &self,
        stack_name: &str,
        value: &Value,
        created: &BTreeMap<String, DeployedResource>,
    ) -> Result<Value, ProvisionError> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if let Some(value) = self.pseudo_parameter(stack_name, target) {
                        return Ok(Value::String(value));
                    }
                    let resource = lookup(created, target)?;
                    return Ok(Value::String(resource.physical_id.clone()));
                }
                if let Some(attribute) = map.get("Fn::GetAtt") {
                    let (target, name) = match attribute {
                        Value::Array(parts) => match (parts.first(), parts.get(1)) {
                            (Some(Value::String(t)), Some(Value::String(a))) => (t.clone(), a.clone()),
                            _ => return Err(ProvisionError::UnsupportedIntrinsic(attribute.to_string())),
                        },
                        Value::String(dotted) => match dotted.split_once('.') {
                            Some((t, a)) => (t.to_string(), a.to_string()),
                            None => return Err(ProvisionError::UnsupportedIntrinsic(dotted.clone())),
                        },
                        _ => return Err(ProvisionError::UnsupportedIntrinsic(attribute.to_string())),
                    };
                    return Ok(Value::String(attribute_of(created, &target, &name)?));
                }
                if let Some(text) = map.get("Fn::Sub") {
                    let Value::String(text) = text else {
                        return Err(ProvisionError::UnsupportedIntrinsic(text.to_string()));
                    };
                    let rendered = render_sub(text, |name| {
                        match self.pseudo_parameter(stack_name, name) {
                            Some(value) => Ok(value),
                            None => match name.split_once('.') {
                                Some((target, attribute)) => attribute_of(created, target, attribute),
                                None => Ok(lookup(created, name)?.physical_id.clone()),
                            },
                        }
                    })?;
                    return Ok(Value::String(rendered));
                }
                if let Some(Value::String(_)) = map.get("Fn::GetAZs") {
                    return Ok(Value::Array(
                        self.availability_zones().into_iter().map(Value::String).collect(),
                    ));
                }
                if let Some(Value::Array(parts)) = map.get("Fn::Select") {
                    let index = parts
                        .first()
                        .and_then(Value::as_u64)
                        .and_then(|index| usize::try_from(index).ok())
                        .ok_or_else(|| ProvisionError::UnsupportedIntrinsic(value.to_string()))?;
                    let list = match parts.get(1) {
                        Some(list) => self.resolve(stack_name, list, created)?,
                        None => return Err(ProvisionError::UnsupportedIntrinsic(value.to_string())),
                    };
                    return list
                        .as_array()
                        .and_then(|items| items.get(index))
                        .cloned()
                        .ok_or_else(|| ProvisionError::UnsupportedIntrinsic(value.to_string()));
                }
                let mut resolved = Map::new();
                for (key, nested) in map {
                    resolved.insert(key.clone(), self.resolve(stack_name, nested, created)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(stack_name, item, created))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }
}

fn lookup<'a>(
    created: &'a BTreeMap<String, DeployedResource>,
    logical_id: &str,
) -> Result<&'a DeployedResource, ProvisionError> {
    created
        .get(logical_id)
        .ok_or_else(|| ProvisionError::UnknownResource(logical_id.to_string()))
}

fn attribute_of(
    created: &BTreeMap<String, DeployedResource>,
    logical_id: &str,
    attribute: &str,
) -> Result<String, ProvisionError> {
    lookup(created, logical_id)?
        .attributes
        .get(attribute)
        .cloned()
        .ok_or_else(|| ProvisionError::UnknownAttribute {
            resource: logical_id.to_string(),
            attribute: attribute.to_string(),
        })
}

/// Kahn's algorithm over the template's dependency graph. Ready resources are
/// taken in lexical order so the result is deterministic.
pub fn creation_order(template: &Template) -> Result<Vec<String>, ProvisionError> {
    template.validate()?;

    let mut pending: BTreeMap<&str, BTreeSet<String>> = template
        .resources
        .keys()
        .map(|id| (id.as_str(), template.dependencies_of(id)))
        .collect();
    let mut order = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready: Vec<&str> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| *id)
            .collect();
        let Some(next) = ready.first().copied() else {
            return Err(ProvisionError::DependencyCycle(
                pending.keys().map(|id| id.to_string()).collect(),
            ));
        };
        pending.remove(next);
        for deps in pending.values_mut() {
            deps.remove(next);
        }
        order.push(next.to_string());
    }

    Ok(order)
}

impl Provisioner for LocalProvisioner {
    #[tracing::instrument(skip(self, template))]
    async fn deploy(&self, stack_name: &str, template: &Template) -> Result<StackOutputs, ProvisionError> {
        let order = creation_order(template)?;
        let mut state = self.state.lock().await;
        let previous = state.stacks.get(stack_name).cloned().unwrap_or_default();

        let mut created: BTreeMap<String, DeployedResource> = BTreeMap::new();
        for logical_id in &order {
            let resource = template
                .resource(logical_id)
                .ok_or_else(|| ProvisionError::UnknownResource(logical_id.clone()))?;

            let (physical_id, attributes) = match previous.resources.get(logical_id) {
                Some(existing) if existing.resource_type == resource.resource_type => {
                    (existing.physical_id.clone(), existing.attributes.clone())
                }
                _ => self.generate(&mut state.rng, stack_name, logical_id, &resource.resource_type),
            };

            let properties = self.resolve(
                stack_name,
                &Value::Object(resource.properties.clone()),
                &created,
            )?;

            tracing::debug!(
                "[provisioner] {} {} ({}) -> {}",
                stack_name,
                logical_id,
                resource.resource_type,
                physical_id
            );

            created.insert(
                logical_id.clone(),
                DeployedResource {
                    resource_type: resource.resource_type.clone(),
                    physical_id,
                    attributes,
                    properties,
                },
            );
        }

        let mut outputs = StackOutputs::new();
        for (key, output) in &template.outputs {
            let value = self.resolve(stack_name, &output.value, &created)?;
            let value = match value {
                Value::String(value) => value,
                other => other.to_string(),
            };
            outputs.insert(key.clone(), value);
        }

        tracing::info!(
            "[provisioner] deployed {} with {} resources",
            stack_name,
            order.len()
        );

        state.stacks.insert(
            stack_name.to_string(),
            DeployedStack {
                creation_order: order,
                resources: created,
                outputs: outputs.clone(),
            },
        );

        Ok(outputs)
    }
}
