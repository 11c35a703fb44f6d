// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::{Result, SolrError};
use crate::models::config::LoadBalancerConfig;
use crate::models::criteria::Criteria;
use crate::models::response::QueryResponse;
use crate::services::client::{ClientFactory, HttpClientFactory};
use crate::services::connection::{Connection, DeleteRequest, IndexRequest, SolrConnection};
use crate::services::record::SolrModel;
use async_trait::async_trait;

/// Routes writes to a write connection and reads to a read connection.
///
/// Without a write connection every operation goes to the read connection.
pub struct LoadBalancer<C> {
    read: C,
    write: Option<C>,
}

impl<C: SolrConnection> LoadBalancer<C> {
    pub fn new(read: C, write: Option<C>) -> Self {
        Self { read, write }
    }

    pub fn read_connection(&self) -> &C {
        &self.read
    }

    /// The connection writes go to.
    pub fn write_connection(&self) -> &C {
        self.write.as_ref().unwrap_or(&self.read)
    }
}

impl<F: ClientFactory + Clone> LoadBalancer<Connection<F>> {
    pub fn from_config(config: LoadBalancerConfig, factory: F) -> Result<Self> {
        let read = config
            .read_connection
            .ok_or_else(|| SolrError::config("The read connection is not configured"))?;
        let write = config
            .write_connection
            .map(|write| Connection::new(write, factory.clone()));
        Ok(Self::new(Connection::new(read, factory), write))
    }
}

impl LoadBalancer<Connection<HttpClientFactory>> {
    pub fn from_http_config(config: LoadBalancerConfig) -> Result<Self> {
        Self::from_config(config, HttpClientFactory)
    }
}

#[async_trait]
impl<C: SolrConnection> SolrConnection for LoadBalancer<C> {
    async fn index(&self, request: IndexRequest<'_>, commit_within: Option<u64>) -> Result<bool> {
        self.write_connection().index(request, commit_within).await
    }

    async fn delete(&self, request: DeleteRequest<'_>) -> Result<bool> {
        self.write_connection().delete(request).await
    }

    async fn commit(&self) -> Result<bool> {
        self.write_connection().commit().await
    }

    async fn search<D: SolrModel>(&self, criteria: &Criteria) -> Result<QueryResponse<D>> {
        self.read.search(criteria).await
    }

    async fn count(&self, criteria: &Criteria) -> Result<u64> {
        self.read.count(criteria).await
    }

    fn last_query_response(&self) -> Option<QueryResponse> {
        self.read.last_query_response()
    }

    fn reset_client(&self) {
        self.read.reset_client();
        if let Some(write) = &self.write {
            write.reset_client();
        }
    }
}
