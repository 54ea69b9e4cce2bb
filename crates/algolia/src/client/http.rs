use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use url::Url;

use super::{
    AlgoliaApi, IndexHandle, IndexSettings, QueryParams, RawSearchResponse, filter_params_string,
};
use crate::config::{AlgoliaConfig, parse_host};
use crate::document::WireDocument;
use crate::error::{ConfigurationError, RemoteServiceError};

const APPLICATION_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";

/// [`AlgoliaApi`] over the Algolia REST API.
#[derive(Clone)]
pub struct HttpAlgoliaClient {
    client: Client,
    app_id: String,
    api_key: String,
    read_base: Url,
    write_base: Url,
}

impl HttpAlgoliaClient {
    /// Creates a client from connection configuration.
    pub fn from_config(alias: &str, config: &AlgoliaConfig) -> Result<Self, ConfigurationError> {
        let base = |key: &str, host: String| {
            parse_host(&host).map_err(|message| ConfigurationError::InvalidValue {
                key: key.to_string(),
                alias: alias.to_string(),
                message,
            })
        };
        let read_base = base("READ_HOST", config.read_base())?;
        let write_base = base("WRITE_HOST", config.write_base())?;

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                key: "REQUEST_TIMEOUT_MS".to_string(),
                alias: alias.to_string(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            read_base,
            write_base,
        })
    }

    fn endpoint(base: &Url, index: &IndexHandle, tail: &[&str]) -> Url {
        let mut url = base.clone();
        // Bases are validated as http(s) URLs, which always accept segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["1", "indexes", index.name()])
                .extend(tail);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(APPLICATION_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, RemoteServiceError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or(body);
            return Err(RemoteServiceError::from_status(status.as_u16(), message));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl fmt::Debug for HttpAlgoliaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAlgoliaClient")
            .field("app_id", &self.app_id)
            .field("read_base", &self.read_base.as_str())
            .field("write_base", &self.write_base.as_str())
            .finish()
    }
}

#[async_trait]
impl AlgoliaApi for HttpAlgoliaClient {
    async fn set_settings(
        &self,
        index: &IndexHandle,
        settings: &IndexSettings,
    ) -> Result<(), RemoteServiceError> {
        let url = Self::endpoint(&self.write_base, index, &["settings"]);
        self.send(self.client.put(url).json(settings)).await?;
        Ok(())
    }

    async fn add_objects(
        &self,
        index: &IndexHandle,
        objects: &[WireDocument],
    ) -> Result<(), RemoteServiceError> {
        let requests: Vec<Value> = objects
            .iter()
            .map(|body| json!({"action": "updateObject", "body": body}))
            .collect();
        let url = Self::endpoint(&self.write_base, index, &["batch"]);
        self.send(self.client.post(url).json(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn delete_object(
        &self,
        index: &IndexHandle,
        object_id: &str,
    ) -> Result<(), RemoteServiceError> {
        let url = Self::endpoint(&self.write_base, index, &[object_id]);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn delete_by(&self, index: &IndexHandle, filters: &str) -> Result<(), RemoteServiceError> {
        let url = Self::endpoint(&self.write_base, index, &["deleteByQuery"]);
        let body = json!({ "params": filter_params_string(filters) });
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn clear_index(&self, index: &IndexHandle) -> Result<(), RemoteServiceError> {
        let url = Self::endpoint(&self.write_base, index, &["clear"]);
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn search(
        &self,
        index: &IndexHandle,
        query: &str,
        params: &QueryParams,
    ) -> Result<RawSearchResponse, RemoteServiceError> {
        let url = Self::endpoint(&self.read_base, index, &["query"]);
        let body = json!({ "params": params.to_params_string(query) });
        let value = self.send(self.client.post(url).json(&body)).await?;
        Ok(serde_json::from_value(value)?)
    }
}
