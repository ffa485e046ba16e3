// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! SigV4-signed HTTP access to a collection.

use std::sync::Arc;
use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    PayloadChecksumKind, SignableBody, SignableRequest, SigningParams, SigningSettings, sign,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request};

use crate::constants::{HTTP_TIMEOUT, SERVICE_NAME};
use crate::credentials::CredentialCache;
use crate::errors::SearchError;
use crate::models::Credential;

/// Signs a request in place for the `aoss` service. The body is hashed into
/// `x-amz-content-sha256`; the session token goes into `x-amz-security-token`.
pub fn sign_request(
    request: &mut Request<Vec<u8>>,
    credential: &Credential,
    region: &str,
    time: SystemTime,
) -> Result<(), SearchError> {
    let identity: Identity = Credentials::from(credential).into();

    let mut settings = SigningSettings::default();
    settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;

    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(SERVICE_NAME)
        .time(time)
        .settings(settings)
        .build()
        .map_err(|e| SearchError::Signing(e.to_string()))?
        .into();

    let headers: Vec<(&str, &str)> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
        .collect();
    let uri = request.uri().to_string();
    let signable = SignableRequest::new(
        request.method().as_str(),
        uri,
        headers.into_iter(),
        SignableBody::Bytes(request.body()),
    )
    .map_err(|e| SearchError::Signing(e.to_string()))?;

    let (instructions, _signature) = sign(signable, &params)
        .map_err(|e| SearchError::Signing(e.to_string()))?
        .into_parts();
    instructions.apply_to_request_http1x(request);

    Ok(())
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub status: u16,
    pub body: String,
}

impl SearchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for one collection endpoint, signing every request with the
/// assumed role's credentials.
#[derive(Clone)]
pub struct SignedClient {
    http: reqwest::Client,
    endpoint: String,
    region: String,
    credentials: Arc<CredentialCache>,
}

impl SignedClient {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        credentials: Arc<CredentialCache>,
    ) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            region: region.into(),
            credentials,
        })
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<SearchResponse, SearchError> {
        let url = format!("{}/{}", self.endpoint, path.trim_start_matches('/'));
        let payload = match body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };

        let mut request = Request::builder()
            .method(method)
            .uri(&url)
            .body(payload)
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        if body.is_some() {
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let credential = self.credentials.get_credentials().await?;
        sign_request(&mut request, &credential, &self.region, SystemTime::now())?;

        let request = reqwest::Request::try_from(request)?;
        let response = self.http.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!("[ingestion] {} -> {}", url, status);

        Ok(SearchResponse { status, body })
    }
}
