// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # AOSS Ingestion
//!
//! The ingestion account side of the deployment.
//!
//! ## Infrastructure
//!
//! - [`network`]: VPC, private subnets and interface endpoints, without NAT
//! - [`execution`]: the function and its execution role
//! - [`stack`]: template synthesis
//!
//! ## Workload
//!
//! The function assumes the role published by the search account, then talks
//! SigV4-signed HTTP to the collection through the OpenSearch Serverless VPC
//! endpoint:
//!
//! - [`configuration`]: environment resolution
//! - [`credentials`]: assume-role provider and credential cache
//! - [`client`]: request signing and transport
//! - [`search`]: index and document operations
//! - [`workflow`]: the four workflow steps
//! - [`runtime`]: Lambda runtime API loop

pub mod client;
pub mod configuration;
pub mod constants;
pub mod credentials;
pub mod errors;
pub mod execution;
pub mod models;
pub mod network;
pub mod runtime;
pub mod search;
pub mod stack;
pub mod workflow;
