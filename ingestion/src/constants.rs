// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

pub const SERVICE_NAME: &str = "aoss";
pub const SESSION_NAME: &str = "aoss-ingestion";
pub const CREDENTIAL_REFRESH_BUFFER: Duration = Duration::from_secs(60); // refresh 60s before expiry
pub const WORKFLOW_TIMEOUT: Duration = Duration::from_secs(60);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// environment
pub const ENV_REGION: &str = "AOSS_REGION";
pub const ENV_COLLECTION_ID: &str = "AOSS_COLLECTION_ID";
pub const ENV_ROLE_ARN: &str = "INGESTION_ROLE_ARN";
pub const ENV_EXTERNAL_ID: &str = "INGESTION_ROLE_EXTERNAL_ID";
pub const ENV_INDEX_NAME: &str = "AOSS_INDEX_NAME";

// sample document
pub const SAMPLE_FIRST_NAME: &str = "John";
pub const SAMPLE_LAST_NAME: &str = "Doe";
pub const SAMPLE_BIRTHDATE: &str = "1970-01-01T01:01:00Z";
pub const BIRTHDATE_FORMAT: &str = "strict_date_optional_time||epoch_millis";

// function
pub const FUNCTION_RUNTIME: &str = "provided.al2023";
pub const FUNCTION_HANDLER: &str = "bootstrap";
pub const FUNCTION_TIMEOUT_SECS: u64 = 60;
pub const FUNCTION_MEMORY_MIB: u64 = 512;
pub const VPC_ACCESS_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaVPCAccessExecutionRole";
pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";

// network
pub const VPC_CIDR: &str = "10.0.0.0/16";
pub const SUBNET_PREFIX_LENGTH: u8 = 19;
pub const MAX_AVAILABILITY_ZONES: usize = 3;
pub const AOSS_ENDPOINT_NAME: &str = "ingestion-aoss-endpoint";
pub const HTTPS_PORT: u16 = 443;

// lambda runtime api
pub const RUNTIME_API_VERSION: &str = "2018-06-01";
pub const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
pub const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";
