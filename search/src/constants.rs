// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

pub const API_ACCESS_ALL: &str = "aoss:APIAccessAll";
pub const COLLECTION_CONDITION_KEY: &str = "aoss:collection";
pub const COLLECTION_TYPE: &str = "SEARCH";

// resource types
pub const SECURITY_POLICY_TYPE: &str = "AWS::OpenSearchServerless::SecurityPolicy";
pub const ACCESS_POLICY_TYPE: &str = "AWS::OpenSearchServerless::AccessPolicy";
pub const COLLECTION_RESOURCE_TYPE: &str = "AWS::OpenSearchServerless::Collection";
pub const ROLE_RESOURCE_TYPE: &str = "AWS::IAM::Role";

// logical ids
pub const ENCRYPTION_POLICY_ID: &str = "EncryptionPolicy";
pub const NETWORK_POLICY_ID: &str = "NetworkPolicy";
pub const ACCESS_POLICY_ID: &str = "AccessPolicy";
pub const COLLECTION_ID: &str = "Collection";
pub const INGESTION_ROLE_ID: &str = "IngestionRole";

pub const INLINE_POLICY_NAME: &str = "AllowApiCalls";
pub const ACCESS_POLICY_DESCRIPTION: &str = "Allow write access from ingestion role";
