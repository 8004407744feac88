//! Meilisearch client implementation.
//!
//! This module provides the concrete implementation of
//! [`SearchEngineClient`] against the Meilisearch REST API.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};
use url::Url;

use search_sync_shared::{DocumentId, IndexSettings};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::interfaces::SearchEngineClient;
use crate::types::{ApiError, EngineStats, SearchParams, SearchResponse, Task, TaskRef};

/// Meilisearch client.
///
/// Every write endpoint answers with an enqueued task reference; callers
/// poll [`get_task`](SearchEngineClient::get_task) until the task reaches a
/// terminal state.
///
/// # Example
///
/// ```ignore
/// use search_sync_repository::{EngineConfig, MeilisearchClient, SearchEngineClient};
///
/// let config = EngineConfig::new("http://localhost:7700");
/// let client = MeilisearchClient::new(config)?;
/// let task = client.create_index("posts", Some("id")).await?;
/// ```
pub struct MeilisearchClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIndexBody<'a> {
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_key: Option<&'a str>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    q: &'a str,
    #[serde(flatten)]
    params: &'a SearchParams,
}

impl MeilisearchClient {
    /// Create a new client from connection configuration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let base_url =
            Url::parse(&config.url).map_err(|e| EngineError::connection(e.to_string()))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| EngineError::connection(e.to_string()))?;

        info!(url = %config.url, "Created Meilisearch client");

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, EngineError> {
        self.base_url
            .join(path)
            .map_err(|e| EngineError::connection(e.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Check the response status and decode the JSON body.
    ///
    /// Non-success responses carry a structured error payload; its message
    /// is surfaced, falling back to the raw body when it does not parse.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, EngineError> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::response_error(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))
    }

    async fn response_error(status: StatusCode, response: Response) -> EngineError {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|api_error| api_error.message)
            .unwrap_or(body);

        error!(status = %status, message = %message, "Engine request failed");
        EngineError::request(status.as_u16(), message)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, EngineError> {
        let url = self.endpoint(path)?;
        let response = self
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::connection(e.to_string()))?;

        Self::decode(response).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, EngineError> {
        let url = self.endpoint(path)?;
        let response = self
            .request(method, url)
            .send()
            .await
            .map_err(|e| EngineError::connection(e.to_string()))?;

        Self::decode(response).await
    }
}

#[async_trait]
impl SearchEngineClient for MeilisearchClient {
    async fn create_index(
        &self,
        uid: &str,
        primary_key: Option<&str>,
    ) -> Result<TaskRef, EngineError> {
        let body = CreateIndexBody { uid, primary_key };
        let task: TaskRef = self.send_json(Method::POST, "indexes", &body).await?;

        debug!(uid = %uid, task_uid = task.task_uid, "Index creation enqueued");
        Ok(task)
    }

    async fn add_documents(
        &self,
        uid: &str,
        primary_key: Option<&str>,
        documents: &[Map<String, Value>],
    ) -> Result<TaskRef, EngineError> {
        let path = match primary_key {
            Some(pk) => format!("indexes/{}/documents?primaryKey={}", uid, pk),
            None => format!("indexes/{}/documents", uid),
        };

        let task: TaskRef = self.send_json(Method::POST, &path, &documents).await?;

        debug!(
            uid = %uid,
            document_count = documents.len(),
            task_uid = task.task_uid,
            "Document batch enqueued"
        );
        Ok(task)
    }

    async fn delete_documents(
        &self,
        uid: &str,
        ids: &[DocumentId],
    ) -> Result<TaskRef, EngineError> {
        let path = format!("indexes/{}/documents/delete-batch", uid);
        let body: Vec<Value> = ids.iter().map(DocumentId::as_json).collect();

        let task: TaskRef = self.send_json(Method::POST, &path, &body).await?;

        debug!(
            uid = %uid,
            document_count = ids.len(),
            task_uid = task.task_uid,
            "Document deletion enqueued"
        );
        Ok(task)
    }

    async fn clear_documents(&self, uid: &str) -> Result<TaskRef, EngineError> {
        let path = format!("indexes/{}/documents", uid);
        self.send(Method::DELETE, &path).await
    }

    async fn delete_index(&self, uid: &str) -> Result<TaskRef, EngineError> {
        let path = format!("indexes/{}", uid);
        let task: TaskRef = self.send(Method::DELETE, &path).await?;

        debug!(uid = %uid, task_uid = task.task_uid, "Index deletion enqueued");
        Ok(task)
    }

    async fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskRef, EngineError> {
        let body: Vec<Value> = pairs
            .iter()
            .map(|(a, b)| json!({"indexes": [a, b]}))
            .collect();

        let task: TaskRef = self.send_json(Method::POST, "swap-indexes", &body).await?;

        info!(pair_count = pairs.len(), task_uid = task.task_uid, "Index swap enqueued");
        Ok(task)
    }

    async fn update_settings(
        &self,
        uid: &str,
        settings: &IndexSettings,
    ) -> Result<TaskRef, EngineError> {
        let path = format!("indexes/{}/settings", uid);
        let task: TaskRef = self.send_json(Method::PATCH, &path, settings).await?;

        debug!(uid = %uid, task_uid = task.task_uid, "Settings update enqueued");
        Ok(task)
    }

    async fn get_task(&self, task_uid: u64) -> Result<Task, EngineError> {
        let path = format!("tasks/{}", task_uid);
        self.send(Method::GET, &path).await
    }

    async fn search(
        &self,
        uid: &str,
        query: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, EngineError> {
        let path = format!("indexes/{}/search", uid);
        let body = SearchBody { q: query, params };
        self.send_json(Method::POST, &path, &body).await
    }

    async fn stats(&self) -> Result<EngineStats, EngineError> {
        self.send(Method::GET, "stats").await
    }
}
