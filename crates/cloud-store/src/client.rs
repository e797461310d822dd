//! HTTP client for the tenant-scoped cloud document store.
//!
//! Implements the engine's `RemoteStore` contract against a hierarchical
//! document API: incremental listing per collection, idempotent creation via
//! a natural-key probe, and batched subtree deletion for data erasure.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use async_trait::async_trait;
use tutorhub_core::auth::TenantAuth;
use tutorhub_core::errors::{Error as CoreError, Result as CoreResult};
use tutorhub_core::sync::{paths, IdempotencyProbe, RemoteDocument, RemoteStore};

use crate::error::{ApiRetryClass, CloudStoreError, Result};
use crate::types::*;

/// Environment variable holding the API base URL.
pub const CLOUD_API_URL_ENV: &str = "CLOUD_API_URL";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

const RETRY_MAX_ATTEMPTS: usize = 3;
const RETRY_BASE_BACKOFF_MS: u64 = 250;
const RETRY_MAX_BACKOFF_MS: u64 = 2_000;

/// Documents deleted per batch request during subtree erasure.
const BATCH_DELETE_CHUNK: usize = 250;

fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

fn backoff_with_jitter(attempt: usize) -> Duration {
    let exp = (attempt.saturating_sub(1) as u32).min(8);
    let backoff =
        (RETRY_BASE_BACKOFF_MS.saturating_mul(1_u64 << exp)).min(RETRY_MAX_BACKOFF_MS);
    let jitter = rand::thread_rng().gen_range(0..=(backoff / 5).max(1));
    Duration::from_millis(backoff.saturating_add(jitter))
}

/// Read the API base URL from the environment.
pub fn cloud_api_base_url() -> Result<String> {
    std::env::var(CLOUD_API_URL_ENV)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            CloudStoreError::invalid_request(format!(
                "{CLOUD_API_URL_ENV} not configured. Cloud sync is disabled."
            ))
        })
}

/// Client for the cloud document store.
#[derive(Clone)]
pub struct CloudStoreClient {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn TenantAuth>,
}

impl CloudStoreClient {
    /// Create a client against `base_url`, e.g. `https://api.tutorhub.app`.
    pub fn new(base_url: &str, auth: Arc<dyn TenantAuth>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Create a client configured from [`CLOUD_API_URL_ENV`].
    pub fn from_env(auth: Arc<dyn TenantAuth>) -> Result<Self> {
        Ok(Self::new(&cloud_api_base_url()?, auth))
    }

    fn docs_url(&self, path: &str) -> String {
        format!("{}/v1/docs/{path}", self.base_url)
    }

    fn batch_delete_url(&self) -> String {
        format!("{}/v1/docs:batchDelete", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let token = self
            .auth
            .access_token()
            .ok_or_else(|| CloudStoreError::auth("No access token available"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| CloudStoreError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Send a request, parse the JSON body, and optionally retry transient
    /// failures. Only idempotent requests (GET, PUT, DELETE) opt into retry;
    /// a bare create must not be re-sent blind.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        retry: bool,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = builder
                .try_clone()
                .ok_or_else(|| CloudStoreError::invalid_request("Request body is not cloneable"))?;

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    if retry && attempt < RETRY_MAX_ATTEMPTS && is_retryable_transport_error(&err) {
                        sleep(backoff_with_jitter(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            };

            let status = response.status();
            let body = response.text().await?;
            Self::log_response(status, &body);

            if status.is_success() {
                return serde_json::from_str(&body).map_err(|e| {
                    log::error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
                    CloudStoreError::api(
                        status.as_u16(),
                        format!("Failed to parse response: {e}"),
                    )
                });
            }

            let err = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api) => CloudStoreError::api(
                    status.as_u16(),
                    format!("{}: {}", api.code, api.message),
                ),
                Err(_) => CloudStoreError::api(status.as_u16(), format!("Request failed: {body}")),
            };
            if retry && attempt < RETRY_MAX_ATTEMPTS && err.retry_class() == ApiRetryClass::Retryable
            {
                sleep(backoff_with_jitter(attempt)).await;
                continue;
            }
            return Err(err);
        }
    }

    async fn list_documents(
        &self,
        collection: &str,
        since: i64,
    ) -> Result<Vec<DocumentEnvelope>> {
        let builder = self
            .client
            .get(self.docs_url(collection))
            .headers(self.headers()?)
            .query(&[("since", since.to_string())]);
        let response: ListDocumentsResponse = self.execute(builder, true).await?;
        Ok(response.documents)
    }

    /// Find at most one document whose `field` equals `value`.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<DocumentEnvelope>> {
        let builder = self
            .client
            .get(self.docs_url(collection))
            .headers(self.headers()?)
            .query(&[("field", field), ("value", value), ("limit", "1")]);
        let response: ListDocumentsResponse = self.execute(builder, true).await?;
        Ok(response.documents.into_iter().next())
    }

    async fn create_document(&self, collection: &str, data: &serde_json::Value) -> Result<String> {
        let builder = self
            .client
            .post(self.docs_url(collection))
            .headers(self.headers()?)
            .json(&WriteDocumentRequest { data: data.clone() });
        let response: WriteDocumentResponse = self.execute(builder, false).await?;
        Ok(response.id)
    }

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        data: &serde_json::Value,
    ) -> Result<String> {
        let builder = self
            .client
            .put(self.docs_url(&format!("{collection}/{document_id}")))
            .headers(self.headers()?)
            .json(&WriteDocumentRequest { data: data.clone() });
        let response: WriteDocumentResponse = self.execute(builder, true).await?;
        Ok(response.id)
    }

    async fn delete_document(&self, document_path: &str) -> Result<()> {
        let builder = self
            .client
            .delete(self.docs_url(document_path))
            .headers(self.headers()?);
        let _: SuccessResponse = self.execute(builder, true).await?;
        Ok(())
    }

    async fn batch_delete(&self, doc_paths: &[String]) -> Result<()> {
        for chunk in doc_paths.chunks(BATCH_DELETE_CHUNK) {
            let builder = self
                .client
                .post(self.batch_delete_url())
                .headers(self.headers()?)
                .json(&BatchDeleteRequest {
                    paths: chunk.to_vec(),
                });
            let _: SuccessResponse = self.execute(builder, true).await?;
        }
        Ok(())
    }

    async fn upload_document(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: serde_json::Value,
        idempotency: Option<IdempotencyProbe>,
    ) -> Result<String> {
        if let Some(id) = document_id {
            return self.set_document(collection, id, &data).await;
        }

        // First-time creation: probe the natural key so a retried push after
        // a crash lands on the document the previous attempt created.
        if let Some(probe) = idempotency {
            if let Some(existing) = self
                .find_by_field(collection, probe.field, &probe.key)
                .await?
            {
                debug!(
                    "Idempotent upload hit existing document {} in {collection}",
                    existing.id
                );
                return self.set_document(collection, &existing.id, &data).await;
            }
        }

        self.create_document(collection, &data).await
    }

    /// Collect every document path under one student subtree.
    async fn collect_subtree_paths(
        &self,
        tenant: &str,
        student_cloud_id: &str,
    ) -> Result<Vec<String>> {
        let mut doomed = Vec::new();

        let schedules = self
            .list_documents(&paths::schedules_collection(tenant, student_cloud_id), 0)
            .await?;
        for schedule in &schedules {
            let exceptions = self
                .list_documents(
                    &paths::exceptions_collection(tenant, student_cloud_id, &schedule.id),
                    0,
                )
                .await?;
            for exception in &exceptions {
                doomed.push(paths::exception_document(
                    tenant,
                    student_cloud_id,
                    &schedule.id,
                    &exception.id,
                ));
            }
            doomed.push(paths::schedule_document(
                tenant,
                student_cloud_id,
                &schedule.id,
            ));
        }

        let shared = self
            .list_documents(
                &paths::shared_resources_collection(tenant, student_cloud_id),
                0,
            )
            .await?;
        for entry in &shared {
            doomed.push(paths::shared_resource_document(
                tenant,
                student_cloud_id,
                &entry.id,
            ));
        }

        doomed.push(paths::student_document(tenant, student_cloud_id));
        Ok(doomed)
    }
}

#[async_trait]
impl RemoteStore for CloudStoreClient {
    async fn upload(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: serde_json::Value,
        idempotency: Option<IdempotencyProbe>,
    ) -> CoreResult<String> {
        self.upload_document(collection, document_id, data, idempotency)
            .await
            .map_err(CoreError::from)
    }

    async fn delete(&self, document_path: &str) -> CoreResult<()> {
        self.delete_document(document_path)
            .await
            .map_err(CoreError::from)
    }

    async fn download_collection(
        &self,
        collection: &str,
        since: i64,
    ) -> CoreResult<Vec<RemoteDocument>> {
        let documents = self
            .list_documents(collection, since)
            .await
            .map_err(CoreError::from)?;
        Ok(documents
            .into_iter()
            .map(|doc| RemoteDocument {
                id: doc.id,
                last_modified: doc.last_modified,
                data: doc.data,
            })
            .collect())
    }

    async fn delete_subtree(&self, tenant: &str, student_cloud_id: &str) -> CoreResult<()> {
        let doomed = self
            .collect_subtree_paths(tenant, student_cloud_id)
            .await
            .map_err(CoreError::from)?;
        debug!(
            "Erasing {} documents under student {student_cloud_id}",
            doomed.len()
        );
        self.batch_delete(&doomed).await.map_err(CoreError::from)
    }
}
