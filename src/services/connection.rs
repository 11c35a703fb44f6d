// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Connection to a single Solr core.

use crate::error::{Result, SolrError};
use crate::models::config::{ClientOptions, ConnectionConfig};
use crate::models::criteria::Criteria;
use crate::models::document::{key_to_string, Document, InputDocument};
use crate::models::response::{QueryResponse, RawResponse};
use crate::services::client::{ClientFactory, HttpClientFactory, SolrClient};
use crate::services::record::SolrModel;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, info, warn, Instrument};

/// Something that can be indexed as part of a batch.
#[derive(Debug, Clone, Copy)]
pub enum Indexable<'a> {
    Document(&'a Document),
    /// Raw field map, sent as-is
    Fields(&'a Map<String, Value>),
}

impl<'a> From<&'a Document> for Indexable<'a> {
    fn from(document: &'a Document) -> Self {
        Indexable::Document(document)
    }
}

#[derive(Debug, Clone)]
pub enum IndexRequest<'a> {
    Single(&'a Document),
    Batch(Vec<Indexable<'a>>),
}

#[derive(Debug, Clone)]
pub enum DeleteRequest<'a> {
    Id(String),
    /// Deleted by its primary key
    Document(&'a Document),
    Batch(Vec<DeleteRequest<'a>>),
}

impl DeleteRequest<'_> {
    fn collect_ids(&self, ids: &mut Vec<String>) -> Result<()> {
        match self {
            DeleteRequest::Id(id) => ids.push(id.clone()),
            DeleteRequest::Document(document) => {
                let id = document.primary_key().and_then(key_to_string).ok_or_else(|| {
                    SolrError::invalid_argument(format!(
                        "document has no usable primary key '{}'",
                        document.primary_key_field()
                    ))
                })?;
                ids.push(id);
            }
            DeleteRequest::Batch(items) => {
                for item in items {
                    item.collect_ids(ids)?;
                }
            }
        }
        Ok(())
    }
}

/// Operations shared by [`Connection`] and
/// [`LoadBalancer`](crate::services::load_balancer::LoadBalancer).
///
/// Update methods return `Ok(false)` when Solr rejects the update and `Err`
/// when it could not be reached.
#[async_trait]
pub trait SolrConnection: Send + Sync {
    /// Add or replace documents. `commit_within` is in milliseconds.
    async fn index(&self, request: IndexRequest<'_>, commit_within: Option<u64>) -> Result<bool>;

    async fn delete(&self, request: DeleteRequest<'_>) -> Result<bool>;

    async fn commit(&self) -> Result<bool>;

    /// Run `criteria` and decode the results as `D`. The caller's criteria
    /// is copied, never modified.
    async fn search<D: SolrModel>(&self, criteria: &Criteria) -> Result<QueryResponse<D>>;

    /// Number of documents matching `criteria`, fetched with `rows=0`.
    async fn count(&self, criteria: &Criteria) -> Result<u64>;

    fn last_query_response(&self) -> Option<QueryResponse>;

    /// Drop the client handle; the next call builds a new one.
    fn reset_client(&self);
}

pub struct Connection<F: ClientFactory = HttpClientFactory> {
    config: ConnectionConfig,
    factory: F,
    client: Mutex<Option<Arc<F::Client>>>,
    last_response: Mutex<Option<Arc<RawResponse>>>,
}

impl Connection<HttpClientFactory> {
    pub fn from_config(config: ConnectionConfig) -> Self {
        Self::new(config, HttpClientFactory)
    }
}

impl<F: ClientFactory> Connection<F> {
    pub fn new(config: ConnectionConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            client: Mutex::new(None),
            last_response: Mutex::new(None),
        }
    }

    pub fn client_options(&self) -> &ClientOptions {
        &self.config.client_options
    }

    pub fn enable_profiling(&self) -> bool {
        self.config.enable_profiling
    }

    /// The current handle, built on first use.
    pub fn client(&self) -> Result<Arc<F::Client>> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(self.factory.create(&self.config.client_options)?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    fn fresh_client(&self) -> Result<Arc<F::Client>> {
        self.reset_client();
        self.client()
    }

    async fn raw_search(&self, criteria: &Criteria) -> Result<Value> {
        let client = self.fresh_client()?;
        let params = criteria.to_query_pairs();

        if !self.config.enable_profiling {
            return client.query(&params).await;
        }

        let span = debug_span!("solr.search", criteria = %criteria);
        let started = Instant::now();
        let payload = client.query(&params).instrument(span).await?;
        debug!(
            criteria = %criteria,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Solr search finished"
        );
        Ok(payload)
    }

    fn remember(&self, payload: Value, criteria: Criteria) -> Arc<RawResponse> {
        let raw = Arc::new(RawResponse::new(payload, criteria));
        *self.last_response.lock() = Some(Arc::clone(&raw));
        raw
    }
}

#[async_trait]
impl<F: ClientFactory> SolrConnection for Connection<F> {
    async fn index(&self, request: IndexRequest<'_>, commit_within: Option<u64>) -> Result<bool> {
        let client = self.client()?;
        let (count, response) = match request {
            IndexRequest::Single(document) => {
                let commit_within = commit_within.or(document.commit_within()).unwrap_or(0);
                let input = document.to_wire_document()?;
                (1, client.add_document(&input, true, commit_within).await?)
            }
            IndexRequest::Batch(items) => {
                let inputs = items
                    .iter()
                    .map(|item| match item {
                        Indexable::Document(document) => document.to_wire_document(),
                        Indexable::Fields(fields) => Ok(InputDocument::from_fields(fields)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let response = client
                    .add_documents(&inputs, true, commit_within.unwrap_or(0))
                    .await?;
                (inputs.len(), response)
            }
        };

        if response.success() {
            info!(count, "Indexed documents");
        } else {
            warn!(count, status = response.status, "Solr rejected index request");
        }
        Ok(response.success())
    }

    async fn delete(&self, request: DeleteRequest<'_>) -> Result<bool> {
        let mut ids = Vec::new();
        request.collect_ids(&mut ids)?;

        let client = self.client()?;
        let response = match ids.as_slice() {
            [id] => client.delete_by_id(id).await?,
            _ => client.delete_by_ids(&ids).await?,
        };

        if response.success() {
            info!(count = ids.len(), "Deleted documents");
        } else {
            warn!(count = ids.len(), status = response.status, "Solr rejected delete request");
        }
        Ok(response.success())
    }

    async fn commit(&self) -> Result<bool> {
        let response = self.client()?.commit().await?;
        info!(success = response.success(), "Committed");
        Ok(response.success())
    }

    async fn search<D: SolrModel>(&self, criteria: &Criteria) -> Result<QueryResponse<D>> {
        let mut request = Criteria::new();
        request.merge(criteria);

        let payload = self.raw_search(&request).await?;
        Ok(QueryResponse::from_raw(self.remember(payload, request)))
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64> {
        let mut request = Criteria::new();
        request.merge(criteria).set_rows(0);

        let payload = self.raw_search(&request).await?;
        Ok(self.remember(payload, request).num_found())
    }

    fn last_query_response(&self) -> Option<QueryResponse> {
        self.last_response
            .lock()
            .as_ref()
            .map(|raw| QueryResponse::from_raw(Arc::clone(raw)))
    }

    fn reset_client(&self) {
        *self.client.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_request_collects_ids() {
        let doc = Document::new().with_field("id", 7);
        let request = DeleteRequest::Batch(vec![
            DeleteRequest::Id("a".into()),
            DeleteRequest::Document(&doc),
        ]);
        let mut ids = Vec::new();
        request.collect_ids(&mut ids).unwrap();
        assert_eq!(ids, vec!["a".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_delete_request_without_primary_key() {
        let doc = Document::new().with_field("name", "orphan");
        let mut ids = Vec::new();
        let err = DeleteRequest::Document(&doc)
            .collect_ids(&mut ids)
            .unwrap_err();
        assert!(matches!(err, SolrError::InvalidArgument { .. }));
    }
}
