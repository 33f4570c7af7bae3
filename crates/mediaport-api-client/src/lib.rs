//! HTTP client for the Mediaport storage authority.
//!
//! Provides a minimal client that authenticates with an optional X-API-Key
//! and JSON helpers that map failures onto [`RegistryError`]. `api` implements
//! [`AssetRegistry`](mediaport_core::AssetRegistry) on top of it and `transfer`
//! holds the HTTP byte transport.

pub mod api;
pub mod transfer;

use anyhow::{Context, Result};
use mediaport_core::{RegistryError, UploaderConfig};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use transfer::HttpTransport;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `X-API-Key: {key}`
    XApiKey(String),
    None,
}

/// HTTP client for the storage authority API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_version: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, api_version: String, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
            auth,
        })
    }

    /// Client for `config.api_url`, authenticating with `X-API-Key` when a key
    /// is configured.
    pub fn from_config(config: &UploaderConfig) -> Result<Self> {
        let auth = match &config.api_key {
            Some(key) => Auth::XApiKey(key.clone()),
            None => Auth::None,
        };
        Self::new(config.api_url.clone(), config.api_version.clone(), auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API version prefix (e.g. "/api/v1").
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix(), path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
            Auth::None => request,
        }
    }

    async fn post<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, RegistryError> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        let request = self.apply_auth(request);

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == StatusCode::PAYLOAD_TOO_LARGE {
                return Err(RegistryError::PayloadTooLarge(error_text));
            }
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        Ok(response)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RegistryError> {
        self.post(path, body)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
    }

    /// POST JSON body, ignoring any response body.
    pub async fn post_json_no_content<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), RegistryError> {
        self.post(path, body).await.map(|_| ())
    }
}
