// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Paged, sorted result lists for list and grid widgets.

use crate::error::{Result, SolrError};
use crate::models::criteria::Criteria;
use crate::models::pagination::Pagination;
use crate::models::response::{Facet, QueryResponse};
use crate::models::sort::SortSpec;
use crate::services::connection::SolrConnection;
use crate::services::record::{Repository, SolrModel};
use std::collections::BTreeMap;

/// Provisional item count while fetching, so the current page is not clamped
/// before the real total is known.
const UNKNOWN_ITEM_COUNT: u64 = 999_999_999;

pub struct DataProvider<D, C> {
    repository: Repository<D, C>,
    criteria: Criteria,
    pagination: Option<Pagination>,
    sort: Option<SortSpec>,
    data: Option<Vec<D>>,
    response: Option<QueryResponse>,
}

impl<D: SolrModel, C: SolrConnection> DataProvider<D, C> {
    /// Pages of 20, sortable by any attribute the model declares.
    pub fn new(repository: Repository<D, C>) -> Self {
        Self {
            repository,
            criteria: Criteria::new(),
            pagination: Some(Pagination::default()),
            sort: Some(SortSpec::for_model(D::attribute_names())),
            data: None,
            response: None,
        }
    }

    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// `None` fetches everything in one request.
    pub fn with_pagination(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn pagination_mut(&mut self) -> Option<&mut Pagination> {
        self.pagination.as_mut()
    }

    pub fn sort_mut(&mut self) -> Option<&mut SortSpec> {
        self.sort.as_mut()
    }

    /// Rows are keyed by their position in the full result set.
    pub fn key_attribute(&self) -> &'static str {
        "position"
    }

    /// Run the query for the current page and sort, replacing any cached data.
    pub async fn fetch_data(&mut self) -> Result<&[D]> {
        let mut criteria = Criteria::new();
        criteria.merge(&self.criteria);

        if let Some(pagination) = self.pagination.as_mut() {
            pagination.set_item_count(UNKNOWN_ITEM_COUNT);
            pagination.apply_limit(&mut criteria);
        }
        if let Some(sort) = &self.sort {
            sort.apply_order(&mut criteria);
        }

        let data = self.repository.find_all(&criteria).await?;
        let response = self.repository.connection().last_query_response();

        if let Some(pagination) = self.pagination.as_mut() {
            let total = response
                .as_ref()
                .map(QueryResponse::total)
                .unwrap_or(data.len() as u64);
            pagination.set_item_count(total);
        }

        self.response = response;
        let data = self.data.insert(data);
        Ok(data.as_slice())
    }

    /// Cached data, fetched on first access.
    pub async fn data(&mut self) -> Result<&[D]> {
        if self.data.is_none() {
            self.fetch_data().await?;
        }
        Ok(self.data.as_deref().unwrap_or_default())
    }

    /// Positions of the fetched rows.
    pub async fn keys(&mut self) -> Result<Vec<usize>> {
        let response = self.ensure_response().await?;
        Ok(response
            .results()?
            .iter()
            .filter_map(|document| document.position())
            .collect())
    }

    /// Total matches across all pages, from a separate count query.
    pub async fn total_item_count(&self) -> Result<u64> {
        self.repository.count(&self.criteria).await
    }

    pub fn solr_query_response(&self) -> Option<&QueryResponse> {
        self.response.as_ref()
    }

    async fn ensure_response(&mut self) -> Result<&QueryResponse> {
        if self.response.is_none() {
            self.fetch_data().await?;
        }
        self.response
            .as_ref()
            .ok_or_else(|| SolrError::invalid_operation("the connection recorded no search response"))
    }

    pub async fn date_facets(&mut self) -> Result<&BTreeMap<String, Facet>> {
        Ok(self.ensure_response().await?.date_facets())
    }

    pub async fn field_facets(&mut self) -> Result<&BTreeMap<String, Facet>> {
        Ok(self.ensure_response().await?.field_facets())
    }

    pub async fn query_facets(&mut self) -> Result<&BTreeMap<String, Facet>> {
        Ok(self.ensure_response().await?.query_facets())
    }

    pub async fn range_facets(&mut self) -> Result<&BTreeMap<String, Facet>> {
        Ok(self.ensure_response().await?.range_facets())
    }
}
