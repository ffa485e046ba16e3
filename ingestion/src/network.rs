// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Private network of the ingestion account.
//!
//! Public and private subnet tiers in up to three availability zones. There is
//! no NAT gateway: the private tier reaches AWS only through interface
//! endpoints. Security group ingress is computed from the services the
//! function talks to, one self-referencing rule per distinct port.

use std::collections::BTreeMap;

use aoss_provisioning::errors::ProvisionError;
use aoss_provisioning::template::{Resource, Template, availability_zone, get_att, reference, sub};
use serde_json::{Value, json};

use crate::constants::{
    AOSS_ENDPOINT_NAME, HTTPS_PORT, MAX_AVAILABILITY_ZONES, SUBNET_PREFIX_LENGTH, VPC_CIDR,
};

pub const VPC_ID: &str = "Vpc";
pub const INTERNET_GATEWAY_ID: &str = "InternetGateway";
pub const GATEWAY_ATTACHMENT_ID: &str = "VpcGatewayAttachment";
pub const PUBLIC_ROUTE_TABLE_ID: &str = "PublicRouteTable";
pub const PUBLIC_DEFAULT_ROUTE_ID: &str = "PublicDefaultRoute";
pub const SECURITY_GROUP_ID: &str = "SecurityGroup";
pub const STS_ENDPOINT_ID: &str = "StsEndpoint";
pub const AOSS_ENDPOINT_ID: &str = "AossEndpoint";

/// A service the function calls from inside the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub service: &'static str,
    pub port: u16,
}

/// Assuming the role through STS, then calling the collection.
pub const CAPABILITIES: &[Capability] = &[
    Capability {
        service: "sts",
        port: HTTPS_PORT,
    },
    Capability {
        service: "aoss",
        port: HTTPS_PORT,
    },
];

/// Services grouped by port.
pub fn ingress_ports(capabilities: &[Capability]) -> BTreeMap<u16, Vec<&'static str>> {
    let mut ports: BTreeMap<u16, Vec<&'static str>> = BTreeMap::new();
    for capability in capabilities {
        let services = ports.entry(capability.port).or_default();
        if !services.contains(&capability.service) {
            services.push(capability.service);
        }
    }
    ports
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Public,
    Private,
}

impl Tier {
    fn name(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

fn subnet_id(tier: Tier, zone: usize) -> String {
    format!("{}Subnet{}", tier.name(), zone + 1)
}

/// `/19` blocks carved from `10.0.0.0/16` in order: public tier first.
fn subnet_cidr(block: usize) -> String {
    let step = 1usize << (24 - SUBNET_PREFIX_LENGTH as usize);
    format!("10.0.{}.0/{}", block * step, SUBNET_PREFIX_LENGTH)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBoundary {
    availability_zones: usize,
    capabilities: Vec<Capability>,
}

impl Default for NetworkBoundary {
    fn default() -> Self {
        Self::new(MAX_AVAILABILITY_ZONES)
    }
}

impl NetworkBoundary {
    pub fn new(availability_zones: usize) -> Self {
        Self {
            availability_zones: availability_zones.clamp(1, MAX_AVAILABILITY_ZONES),
            capabilities: CAPABILITIES.to_vec(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn availability_zones(&self) -> usize {
        self.availability_zones
    }

    pub fn private_subnet_ids(&self) -> Vec<String> {
        (0..self.availability_zones)
            .map(|zone| subnet_id(Tier::Private, zone))
            .collect()
    }

    pub fn private_subnet_refs(&self) -> Value {
        Value::Array(
            self.private_subnet_ids()
                .iter()
                .map(|id| reference(id))
                .collect(),
        )
    }

    pub fn security_group_refs(&self) -> Value {
        json!([get_att(SECURITY_GROUP_ID, "GroupId")])
    }

    pub fn add_to(&self, template: &mut Template) -> Result<(), ProvisionError> {
        template.add_resource(
            VPC_ID,
            Resource::new("AWS::EC2::VPC")
                .with_property("CidrBlock", VPC_CIDR)
                .with_property("EnableDnsHostnames", true)
                .with_property("EnableDnsSupport", true),
        )?;

        self.add_subnets(template)?;
        self.add_security_group(template)?;

        template.add_resource(
            STS_ENDPOINT_ID,
            Resource::new("AWS::EC2::VPCEndpoint")
                .with_property("ServiceName", sub("com.amazonaws.${AWS::Region}.sts"))
                .with_property("VpcEndpointType", "Interface")
                .with_property("VpcId", reference(VPC_ID))
                .with_property("SubnetIds", self.private_subnet_refs())
                .with_property("SecurityGroupIds", self.security_group_refs())
                .with_property("PrivateDnsEnabled", true),
        )?;

        template.add_resource(
            AOSS_ENDPOINT_ID,
            Resource::new("AWS::OpenSearchServerless::VpcEndpoint")
                .with_property("Name", AOSS_ENDPOINT_NAME)
                .with_property("VpcId", reference(VPC_ID))
                .with_property("SubnetIds", self.private_subnet_refs())
                .with_property("SecurityGroupIds", self.security_group_refs()),
        )?;

        Ok(())
    }

    fn add_subnets(&self, template: &mut Template) -> Result<(), ProvisionError> {
        template.add_resource(INTERNET_GATEWAY_ID, Resource::new("AWS::EC2::InternetGateway"))?;
        template.add_resource(
            GATEWAY_ATTACHMENT_ID,
            Resource::new("AWS::EC2::VPCGatewayAttachment")
                .with_property("VpcId", reference(VPC_ID))
                .with_property("InternetGatewayId", reference(INTERNET_GATEWAY_ID)),
        )?;
        template.add_resource(
            PUBLIC_ROUTE_TABLE_ID,
            Resource::new("AWS::EC2::RouteTable").with_property("VpcId", reference(VPC_ID)),
        )?;
        template.add_resource(
            PUBLIC_DEFAULT_ROUTE_ID,
            Resource::new("AWS::EC2::Route")
                .with_property("RouteTableId", reference(PUBLIC_ROUTE_TABLE_ID))
                .with_property("DestinationCidrBlock", "0.0.0.0/0")
                .with_property("GatewayId", reference(INTERNET_GATEWAY_ID)),
        )?;
        template.add_dependency(PUBLIC_DEFAULT_ROUTE_ID, GATEWAY_ATTACHMENT_ID)?;

        let mut block = 0;
        for tier in [Tier::Public, Tier::Private] {
            for zone in 0..self.availability_zones {
                let subnet = subnet_id(tier, zone);
                template.add_resource(
                    subnet.as_str(),
                    Resource::new("AWS::EC2::Subnet")
                        .with_property("VpcId", reference(VPC_ID))
                        .with_property("CidrBlock", subnet_cidr(block))
                        .with_property("AvailabilityZone", availability_zone(zone))
                        .with_property("MapPublicIpOnLaunch", tier == Tier::Public),
                )?;
                block += 1;

                // private subnets get a route table without a default route
                let route_table = match tier {
                    Tier::Public => PUBLIC_ROUTE_TABLE_ID.to_string(),
                    Tier::Private => {
                        let id = format!("{subnet}RouteTable");
                        template.add_resource(
                            id.as_str(),
                            Resource::new("AWS::EC2::RouteTable")
                                .with_property("VpcId", reference(VPC_ID)),
                        )?;
                        id
                    }
                };
                template.add_resource(
                    format!("{subnet}RouteTableAssociation"),
                    Resource::new("AWS::EC2::SubnetRouteTableAssociation")
                        .with_property("SubnetId", reference(&subnet))
                        .with_property("RouteTableId", reference(&route_table)),
                )?;
            }
        }
        Ok(())
    }

    fn add_security_group(&self, template: &mut Template) -> Result<(), ProvisionError> {
        template.add_resource(
            SECURITY_GROUP_ID,
            Resource::new("AWS::EC2::SecurityGroup")
                .with_property("GroupDescription", "Ingestion function and interface endpoints")
                .with_property("VpcId", reference(VPC_ID))
                .with_property(
                    "SecurityGroupEgress",
                    json!([{ "IpProtocol": "-1", "CidrIp": "0.0.0.0/0" }]),
                ),
        )?;

        for (port, services) in ingress_ports(&self.capabilities) {
            template.add_resource(
                format!("SecurityGroupIngress{port}"),
                Resource::new("AWS::EC2::SecurityGroupIngress")
                    .with_property("GroupId", get_att(SECURITY_GROUP_ID, "GroupId"))
                    .with_property("SourceSecurityGroupId", get_att(SECURITY_GROUP_ID, "GroupId"))
                    .with_property("IpProtocol", "tcp")
                    .with_property("FromPort", port)
                    .with_property("ToPort", port)
                    .with_property("Description", format!("{} from group members", services.join(", "))),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aoss_provisioning::provisioner::creation_order;

    use super::*;

    fn template() -> Template {
        let mut template = Template::default();
        NetworkBoundary::default().add_to(&mut template).unwrap();
        template
    }

    #[test]
    fn test_one_ingress_rule_per_distinct_port() {
        let ports = ingress_ports(CAPABILITIES);
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[&443], vec!["sts", "aoss"]);

        let template = template();
        let rules: Vec<&Resource> = template
            .resources
            .values()
            .filter(|r| r.resource_type == "AWS::EC2::SecurityGroupIngress")
            .collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].property("FromPort"), Some(&json!(443)));
        assert_eq!(rules[0].property("IpProtocol"), Some(&json!("tcp")));
        assert_eq!(
            rules[0].property("SourceSecurityGroupId"),
            rules[0].property("GroupId")
        );
    }

    #[test]
    fn test_extra_capability_adds_a_rule() {
        let mut template = Template::default();
        NetworkBoundary::default()
            .with_capability(Capability {
                service: "logs",
                port: 8443,
            })
            .add_to(&mut template)
            .unwrap();
        assert!(template.resource("SecurityGroupIngress8443").is_some());
        assert!(template.resource("SecurityGroupIngress443").is_some());
    }

    #[test]
    fn test_no_nat_gateway_and_private_tier_has_no_default_route() {
        let template = template();
        assert!(
            !template
                .resources
                .values()
                .any(|r| r.resource_type == "AWS::EC2::NatGateway")
        );
        let routes: Vec<&Resource> = template
            .resources
            .values()
            .filter(|r| r.resource_type == "AWS::EC2::Route")
            .collect();
        assert_eq!(routes.len(), 1);
        assert_eq!(
            routes[0].property("RouteTableId"),
            Some(&reference(PUBLIC_ROUTE_TABLE_ID))
        );
    }

    #[test]
    fn test_subnet_layout() {
        let template = template();
        let cidr = |id: &str| {
            template
                .resource(id)
                .unwrap()
                .property("CidrBlock")
                .unwrap()
                .clone()
        };
        assert_eq!(cidr("PublicSubnet1"), json!("10.0.0.0/19"));
        assert_eq!(cidr("PublicSubnet3"), json!("10.0.64.0/19"));
        assert_eq!(cidr("PrivateSubnet1"), json!("10.0.96.0/19"));
        assert_eq!(cidr("PrivateSubnet3"), json!("10.0.160.0/19"));
        assert_eq!(
            NetworkBoundary::new(1).private_subnet_ids(),
            vec!["PrivateSubnet1".to_string()]
        );
        assert_eq!(NetworkBoundary::new(9).availability_zones(), 3);
    }

    #[test]
    fn test_endpoints_live_in_private_subnets() {
        let template = template();
        let subnets = json!([
            { "Ref": "PrivateSubnet1" },
            { "Ref": "PrivateSubnet2" },
            { "Ref": "PrivateSubnet3" }
        ]);
        for id in [STS_ENDPOINT_ID, AOSS_ENDPOINT_ID] {
            assert_eq!(template.resource(id).unwrap().property("SubnetIds"), Some(&subnets));
        }
        assert_eq!(
            template.resource(AOSS_ENDPOINT_ID).unwrap().property("Name"),
            Some(&json!("ingestion-aoss-endpoint"))
        );
        assert_eq!(
            template
                .resource(STS_ENDPOINT_ID)
                .unwrap()
                .property("PrivateDnsEnabled"),
            Some(&json!(true))
        );
    }

    #[test]
    fn test_template_is_deployable() {
        let order = creation_order(&template()).unwrap();
        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert!(position(VPC_ID) < position("PrivateSubnet1"));
        assert!(position(GATEWAY_ATTACHMENT_ID) < position(PUBLIC_DEFAULT_ROUTE_ID));
        assert!(position(SECURITY_GROUP_ID) < position(AOSS_ENDPOINT_ID));
    }
}
