// everest-control-cluster/src/kube.rs
// ============================================================================
// Module: Kube Cluster Client
// Description: Cluster API backend for object CRUD.
// Purpose: Map ClusterClient calls onto the cluster REST API over HTTP(S).
// Dependencies: everest-control-core, reqwest, url
// ============================================================================

//! ## Overview
//! Core kinds live under `/api/v1`; Everest custom resources live under
//! `/apis/<group>/<version>`. Namespaced kinds add a `namespaces/<ns>`
//! segment when a namespace is given. Path segments are percent-encoded by
//! [`Url::path_segments_mut`].
//!
//! Status mapping:
//! - 2xx: body decoded as JSON.
//! - 404: [`ClusterError::NotFound`].
//! - other: [`ClusterError::Rejected`] carrying the server's `message`.
//!
//! TLS trusts the bundled web roots plus an optional cluster CA supplied to
//! [`KubeClusterClient::with_ca_pem`].
//!
//! Security posture: the cluster API is an external trust boundary; response
//! bodies are size-bounded and decoded fail-closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use everest_control_core::ClusterClient;
use everest_control_core::ClusterError;
use everest_control_core::ClusterObject;
use everest_control_core::ResourceKind;
use everest_control_core::core::objects::EVEREST_API_VERSION;
use reqwest::Certificate;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde_json::Value;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum response body size accepted from the cluster API.
pub(crate) const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum bearer token file size.
pub(crate) const MAX_TOKEN_BYTES: usize = 64 * 1024;
/// Maximum cluster CA bundle size.
pub(crate) const MAX_CA_BYTES: usize = 1024 * 1024;
/// Marker that opens a PEM certificate block.
const PEM_CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";
/// Maximum length of a server message carried in an error.
pub(crate) const MAX_ERROR_MESSAGE_LEN: usize = 512;
/// JSON media type.
const APPLICATION_JSON: &str = "application/json";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Cluster API client.
///
/// # Invariants
/// - Base URL is normalized without a trailing slash.
pub struct KubeClusterClient {
    /// Cluster API base URL.
    base_url: Url,
    /// Optional bearer token.
    auth_token: Option<String>,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl KubeClusterClient {
    /// Builds a client for the given API server.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Unavailable`] when the URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ClusterError> {
        Self::build(base_url, auth_token, None, connect_timeout, request_timeout)
    }

    /// Builds a client that also trusts the cluster CA in `ca_pem`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Unavailable`] when the URL is unusable, the
    /// certificate cannot be parsed, or the HTTP client cannot be built.
    pub fn with_ca_pem(
        base_url: &str,
        auth_token: Option<String>,
        ca_pem: &[u8],
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ClusterError> {
        Self::build(base_url, auth_token, Some(ca_pem), connect_timeout, request_timeout)
    }

    /// Shared constructor.
    fn build(
        base_url: &str,
        auth_token: Option<String>,
        ca_pem: Option<&[u8]>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ClusterError> {
        let mut base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| ClusterError::Unavailable(format!("invalid api url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClusterError::Unavailable("api url cannot be a base".to_string()));
        }
        base_url.set_query(None);
        let mut builder = Client::builder().connect_timeout(connect_timeout).timeout(request_timeout);
        if let Some(ca_pem) = ca_pem {
            let cert = Certificate::from_pem(ca_pem)
                .map_err(|err| ClusterError::Unavailable(format!("invalid cluster ca: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build().map_err(|err| ClusterError::Unavailable(err.to_string()))?;
        Ok(Self {
            base_url,
            auth_token,
            client,
        })
    }

    /// Builds the collection URL for a kind.
    fn collection_url(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Url, ClusterError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ClusterError::Unavailable("api url cannot be a base".to_string()))?;
            segments.pop_if_empty();
            match kind.group() {
                Some(group) => {
                    segments.extend(["apis", group, EVEREST_API_VERSION]);
                }
                None => {
                    segments.extend(["api", "v1"]);
                }
            }
            if kind.namespaced()
                && let Some(namespace) = namespace
            {
                segments.extend(["namespaces", namespace]);
            }
            segments.push(kind.plural());
        }
        Ok(url)
    }

    /// Builds the URL of one named object.
    fn object_url(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Url, ClusterError> {
        let mut url = self.collection_url(kind, namespace)?;
        url.path_segments_mut()
            .map_err(|()| ClusterError::Unavailable("api url cannot be a base".to_string()))?
            .push(name);
        Ok(url)
    }

    /// Builds headers for cluster API requests.
    fn build_headers(&self) -> Result<HeaderMap, ClusterError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClusterError::Unavailable("invalid auth token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Sends a request and returns the decoded JSON body.
    async fn send(
        &self,
        request: RequestBuilder,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let mut response = request
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|err| ClusterError::Unavailable(err.to_string()))?;
        let status = response.status();
        if response.content_length().is_some_and(|len| len > MAX_RESPONSE_BYTES as u64) {
            return Err(ClusterError::InvalidResponse(
                "response exceeds size limit".to_string(),
            ));
        }
        let mut body = Vec::new();
        while let Some(chunk) =
            response.chunk().await.map_err(|err| ClusterError::Unavailable(err.to_string()))?
        {
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(ClusterError::InvalidResponse(
                    "response exceeds size limit".to_string(),
                ));
            }
            body.extend_from_slice(&chunk);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound {
                kind: kind.kind(),
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ClusterError::Rejected {
                status: status.as_u16(),
                message: status_message(&body, status),
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|err| ClusterError::InvalidResponse(err.to_string()))
    }

    /// Serializes an object body, filling in its type metadata.
    fn encode_body(kind: ResourceKind, object: &ClusterObject) -> Result<Vec<u8>, ClusterError> {
        let mut value = object.as_value().clone();
        let Some(fields) = value.as_object_mut() else {
            return Err(ClusterError::Rejected {
                status: 400,
                message: "object body must be a JSON object".to_string(),
            });
        };
        fields.entry("apiVersion").or_insert_with(|| Value::String(kind.api_version()));
        fields.entry("kind").or_insert_with(|| Value::String(kind.kind().to_string()));
        serde_json::to_vec(&value).map_err(|err| ClusterError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ClusterObject, ClusterError> {
        let url = self.object_url(kind, namespace, name)?;
        let value = self.send(self.client.get(url), kind, name).await?;
        Ok(ClusterObject::new(value))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<ClusterObject>, ClusterError> {
        let mut url = self.collection_url(kind, namespace)?;
        if let Some(selector) = label_selector {
            url.query_pairs_mut().append_pair("labelSelector", selector);
        }
        let value = self.send(self.client.get(url), kind, kind.plural()).await?;
        let Value::Object(mut fields) = value else {
            return Err(ClusterError::InvalidResponse("list response is not an object".to_string()));
        };
        match fields.remove("items") {
            Some(Value::Array(items)) => Ok(items.into_iter().map(ClusterObject::new).collect()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(ClusterError::InvalidResponse("list items is not an array".to_string())),
        }
    }

    async fn create(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        object: &ClusterObject,
    ) -> Result<ClusterObject, ClusterError> {
        let url = self.collection_url(kind, namespace)?;
        let body = Self::encode_body(kind, object)?;
        let name = object.name().unwrap_or_default().to_string();
        let request = self.client.post(url).header(CONTENT_TYPE, APPLICATION_JSON).body(body);
        let value = self.send(request, kind, &name).await?;
        Ok(ClusterObject::new(value))
    }

    async fn replace(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        object: &ClusterObject,
    ) -> Result<ClusterObject, ClusterError> {
        let url = self.object_url(kind, namespace, name)?;
        let body = Self::encode_body(kind, object)?;
        let request = self.client.put(url).header(CONTENT_TYPE, APPLICATION_JSON).body(body);
        let value = self.send(request, kind, name).await?;
        Ok(ClusterObject::new(value))
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClusterError> {
        let url = self.object_url(kind, namespace, name)?;
        self.send(self.client.delete(url), kind, name).await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Credential Loading
// ============================================================================

/// Bearer token and CA bundle loading failures.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token file could not be read.
    #[error("token file io error: {0}")]
    Io(String),
    /// Token file content is unusable.
    #[error("invalid token file: {0}")]
    Invalid(String),
}

/// Reads a bearer token from a file, trimming surrounding whitespace.
///
/// # Errors
///
/// Returns [`TokenError`] when the file is unreadable, oversized, not UTF-8,
/// or empty.
pub fn read_token_file(path: &Path) -> Result<String, TokenError> {
    let bytes = fs::read(path).map_err(|err| TokenError::Io(err.to_string()))?;
    if bytes.len() > MAX_TOKEN_BYTES {
        return Err(TokenError::Invalid("token file exceeds size limit".to_string()));
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| TokenError::Invalid("token file must be utf-8".to_string()))?;
    let token = text.trim();
    if token.is_empty() {
        return Err(TokenError::Invalid("token file is empty".to_string()));
    }
    Ok(token.to_string())
}

/// Reads a PEM cluster CA bundle.
///
/// # Errors
///
/// Returns [`TokenError`] when the file is unreadable, oversized, or holds
/// no PEM certificate.
pub fn read_ca_file(path: &Path) -> Result<Vec<u8>, TokenError> {
    let bytes = fs::read(path).map_err(|err| TokenError::Io(err.to_string()))?;
    if bytes.len() > MAX_CA_BYTES {
        return Err(TokenError::Invalid("ca file exceeds size limit".to_string()));
    }
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| TokenError::Invalid("ca file must be utf-8 pem".to_string()))?;
    if !text.contains(PEM_CERTIFICATE_MARKER) {
        return Err(TokenError::Invalid("ca file holds no pem certificate".to_string()));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts a human-readable message from an error response body.
fn status_message(body: &[u8], status: StatusCode) -> String {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    truncate_message(message)
}

/// Truncates a message on a character boundary.
fn truncate_message(mut message: String) -> String {
    if message.len() > MAX_ERROR_MESSAGE_LEN {
        let mut cut = MAX_ERROR_MESSAGE_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
