// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # AOSS Provisioning
//!
//! Shared vocabulary of the cross-account OpenSearch Serverless deployment.
//!
//! Two units are deployed into two accounts and only ever exchange plain
//! identifiers:
//!
//! ```text
//! IngestionStack (account A) --VpcEndpointId-------------------> SearchStack (account B)
//!                            <--CollectionId, IngestionRoleArn--
//! ```
//!
//! ## Modules
//!
//! - [`template`]: declarative resource descriptions and intrinsics
//! - [`iam`]: IAM policy documents
//! - [`provisioner`]: the substrate interface and an in-process implementation
//! - [`outputs`]: stack outputs and the outputs file
//! - [`parameters`]: validated deployment parameters and bootstrap state
//! - [`bootstrap`]: the reconciliation pass closing the two-phase loop
//! - [`telemetry`]: tracing subscriber setup

pub mod bootstrap;
pub mod errors;
pub mod iam;
pub mod outputs;
pub mod parameters;
pub mod provisioner;
pub mod telemetry;
pub mod template;
