// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::{Result, SolrError};
use crate::models::config::ClientOptions;
use crate::models::document::InputDocument;
use crate::services::logging::redact_credentials;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

const USER_AGENT: &str = env!("LALA_SOLR_USER_AGENT");

/// Outcome of an update-handler call (add, delete, commit).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    /// HTTP status of the update request
    pub http_status: u16,
    /// `responseHeader.status` reported by Solr, 0 on success
    pub status: i64,
    pub payload: Value,
}

impl UpdateResponse {
    pub fn from_payload(http_status: u16, payload: Value) -> Self {
        let status = payload
            .pointer("/responseHeader/status")
            .and_then(Value::as_i64)
            .unwrap_or(if (200..300).contains(&http_status) { 0 } else { -1 });
        Self {
            http_status,
            status,
            payload,
        }
    }

    pub fn success(&self) -> bool {
        (200..300).contains(&self.http_status) && self.status == 0
    }
}

/// The native Solr client boundary. One instance talks to one core.
///
/// `commit_within` is in milliseconds; 0 leaves commit timing to the server.
#[async_trait]
pub trait SolrClient: Send + Sync {
    async fn add_document(
        &self,
        document: &InputDocument,
        overwrite: bool,
        commit_within: u64,
    ) -> Result<UpdateResponse>;

    async fn add_documents(
        &self,
        documents: &[InputDocument],
        overwrite: bool,
        commit_within: u64,
    ) -> Result<UpdateResponse>;

    async fn delete_by_id(&self, id: &str) -> Result<UpdateResponse>;

    async fn delete_by_ids(&self, ids: &[String]) -> Result<UpdateResponse>;

    async fn commit(&self) -> Result<UpdateResponse>;

    /// Run a select request and return the decoded JSON payload.
    async fn query(&self, params: &[(String, String)]) -> Result<Value>;
}

/// Builds client handles from options. Connections call this every time they
/// need a fresh handle.
pub trait ClientFactory: Send + Sync {
    type Client: SolrClient + 'static;

    fn create(&self, options: &ClientOptions) -> Result<Self::Client>;
}

/// [`SolrClient`] over HTTP using the JSON update handler and form-encoded selects.
pub struct HttpSolrClient {
    http: reqwest::Client,
    base_url: Url,
    login: Option<String>,
    password: Option<String>,
}

impl HttpSolrClient {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: options.base_url()?,
            login: options.login.clone(),
            password: options.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, handler: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}/{}", self.base_url.path().trim_end_matches('/'), handler));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("wt", "json");
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }
        url
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.http.post(url);
        match &self.login {
            Some(login) => request.basic_auth(login, self.password.as_ref()),
            None => request,
        }
    }

    async fn update(&self, params: &[(&str, String)], body: Value) -> Result<UpdateResponse> {
        let url = self.endpoint("update", params);
        debug!(url = %redact_credentials(url.as_str()), "Solr update");

        let response = self
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        let http_status = response.status().as_u16();
        let text = response.text().await?;
        let payload = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(UpdateResponse::from_payload(http_status, payload))
    }
}

fn commit_within_params(overwrite: bool, commit_within: u64) -> Vec<(&'static str, String)> {
    let mut params = vec![("overwrite", overwrite.to_string())];
    if commit_within > 0 {
        params.push(("commitWithin", commit_within.to_string()));
    }
    params
}

#[async_trait]
impl SolrClient for HttpSolrClient {
    async fn add_document(
        &self,
        document: &InputDocument,
        overwrite: bool,
        commit_within: u64,
    ) -> Result<UpdateResponse> {
        let mut add = json!({"doc": document.to_json(), "overwrite": overwrite});
        if commit_within > 0 {
            add["commitWithin"] = json!(commit_within);
        }
        self.update(&[], json!({ "add": add })).await
    }

    async fn add_documents(
        &self,
        documents: &[InputDocument],
        overwrite: bool,
        commit_within: u64,
    ) -> Result<UpdateResponse> {
        let docs: Vec<Value> = documents.iter().map(InputDocument::to_json).collect();
        self.update(&commit_within_params(overwrite, commit_within), Value::Array(docs))
            .await
    }

    async fn delete_by_id(&self, id: &str) -> Result<UpdateResponse> {
        self.update(&[], json!({"delete": {"id": id}})).await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<UpdateResponse> {
        self.update(&[], json!({ "delete": ids })).await
    }

    async fn commit(&self) -> Result<UpdateResponse> {
        self.update(&[], json!({"commit": {}})).await
    }

    async fn query(&self, params: &[(String, String)]) -> Result<Value> {
        let url = self.endpoint("select", &[]);
        // the serializer is not Send, so it must not live across an await
        let body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in params {
                form.append_pair(name, value);
            }
            form.finish()
        };
        debug!(url = %redact_credentials(url.as_str()), params = %body, "Solr select");

        let response = self
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.pointer("/error/msg").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(SolrError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Default factory producing [`HttpSolrClient`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    type Client = HttpSolrClient;

    fn create(&self, options: &ClientOptions) -> Result<HttpSolrClient> {
        HttpSolrClient::new(options)
    }
}
