// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # AOSS Search Stack
//!
//! The search account side of the deployment: an OpenSearch Serverless
//! collection that accepts writes only from one trusted role, and only through
//! one VPC endpoint.
//!
//! - [`policy`]: encryption, network and data-access policies
//! - [`role`]: the role the ingestion account assumes
//! - [`collection`]: the collection resource
//! - [`stack`]: template synthesis

pub mod collection;
pub mod constants;
pub mod errors;
pub mod policy;
pub mod role;
pub mod stack;
