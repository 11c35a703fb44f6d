// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Typed records stored in Solr and the finder operations over them.

use crate::error::{Result, SolrError};
use crate::models::criteria::Criteria;
use crate::models::document::{key_to_string, AttributeMapping, Document, DEFAULT_PRIMARY_KEY};
use crate::models::response::QueryResponse;
use crate::services::connection::{DeleteRequest, IndexRequest, SolrConnection};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A model type that can be decoded from and encoded to a Solr document.
pub trait SolrModel: Sized + Send + Sync + 'static {
    /// Name of the unique key field
    fn primary_key() -> &'static str {
        DEFAULT_PRIMARY_KEY
    }

    /// Declared attribute names, used as the default sortable attributes.
    fn attribute_names() -> Vec<String> {
        Vec::new()
    }

    fn attribute_mapping() -> AttributeMapping {
        AttributeMapping::default()
    }

    /// Build an instance from a decoded result row. The document carries the
    /// search metadata (position, score, highlights) and the old primary key.
    fn populate(document: Document) -> Result<Self>;

    fn to_document(&self) -> Result<Document>;
}

impl SolrModel for Document {
    fn populate(document: Document) -> Result<Self> {
        Ok(document)
    }

    fn to_document(&self) -> Result<Document> {
        Ok(self.clone())
    }
}

/// Lifecycle callbacks. `before_save` and `before_delete` cancel the
/// operation by returning `false`.
pub trait RecordHooks<D>: Send + Sync {
    fn before_save(&self, _record: &D) -> bool {
        true
    }

    fn after_save(&self, _record: &D) {}

    fn before_delete(&self, _record: &D) -> bool {
        true
    }

    fn after_delete(&self, _record: &D) {}

    fn before_find(&self, _criteria: &mut Criteria) {}

    fn after_find(&self, _record: &mut D) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<D> RecordHooks<D> for NoHooks {}

/// Finder and persistence operations for model `D` over connection `C`.
pub struct Repository<D, C> {
    connection: Arc<C>,
    default_scope: Option<Criteria>,
    scopes: HashMap<String, Criteria>,
    hooks: Arc<dyn RecordHooks<D>>,
    _model: PhantomData<fn() -> D>,
}

impl<D, C> Clone for Repository<D, C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            default_scope: self.default_scope.clone(),
            scopes: self.scopes.clone(),
            hooks: Arc::clone(&self.hooks),
            _model: PhantomData,
        }
    }
}

impl<D: SolrModel, C: SolrConnection> Repository<D, C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            connection,
            default_scope: None,
            scopes: HashMap::new(),
            hooks: Arc::new(NoHooks),
            _model: PhantomData,
        }
    }

    pub fn with_default_scope(mut self, scope: Criteria) -> Self {
        self.default_scope = Some(scope);
        self
    }

    pub fn with_scope(mut self, name: impl Into<String>, scope: Criteria) -> Self {
        self.scopes.insert(name.into(), scope);
        self
    }

    /// Register named scopes from a `{name: {property: value}}` object.
    pub fn with_scopes_from_json(mut self, scopes: &Map<String, Value>) -> Result<Self> {
        for (name, properties) in scopes {
            let properties = properties.as_object().ok_or_else(|| {
                SolrError::config(format!("scope '{}' must be an object", name))
            })?;
            self.scopes
                .insert(name.clone(), Criteria::from_properties(properties)?);
        }
        Ok(self)
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RecordHooks<D>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// Merge the default scope, then every named scope the criteria (or the
    /// default scope) lists, then the criteria itself. The result carries no
    /// scope names and always has a query.
    pub fn apply_scopes(&self, criteria: &Criteria) -> Result<Criteria> {
        let mut merged = self.default_scope.clone().unwrap_or_default();
        let mut names: Vec<String> = merged.scopes().to_vec();
        names.extend(criteria.scopes().iter().cloned());
        merged.clear_scopes();

        for name in &names {
            let scope = self
                .scopes
                .get(name)
                .ok_or_else(|| SolrError::config(format!("unknown scope '{}'", name)))?;
            merged.merge(scope);
        }
        merged.merge(criteria).clear_scopes();

        if merged.query().is_none() {
            merged.set_query("*:*");
        }
        Ok(merged)
    }

    fn prepare(&self, criteria: &Criteria) -> Result<Criteria> {
        let mut prepared = self.apply_scopes(criteria)?;
        self.hooks.before_find(&mut prepared);
        Ok(prepared)
    }

    async fn fetch(&self, criteria: Criteria) -> Result<Vec<D>> {
        debug!(criteria = %criteria, "Finding records");
        let response: QueryResponse<D> = self.connection.search(&criteria).await?;
        let mut records = response.into_results()?.into_items();
        for record in &mut records {
            self.hooks.after_find(record);
        }
        Ok(records)
    }

    /// First record matching the criteria.
    pub async fn find(&self, criteria: &Criteria) -> Result<Option<D>> {
        let mut prepared = self.prepare(criteria)?;
        prepared.set_limit(1);
        Ok(self.fetch(prepared).await?.into_iter().next())
    }

    pub async fn find_all(&self, criteria: &Criteria) -> Result<Vec<D>> {
        let prepared = self.prepare(criteria)?;
        self.fetch(prepared).await
    }

    pub async fn find_by_pk(&self, pk: impl fmt::Display, criteria: &Criteria) -> Result<Option<D>> {
        let mut by_pk = pk_criteria::<D>(&[pk.to_string()]);
        by_pk.merge(criteria);
        self.find(&by_pk).await
    }

    pub async fn find_all_by_pk<S: AsRef<str>>(&self, pks: &[S], criteria: &Criteria) -> Result<Vec<D>> {
        if pks.is_empty() {
            return Ok(Vec::new());
        }
        let pks: Vec<String> = pks.iter().map(|pk| pk.as_ref().to_string()).collect();
        let mut by_pk = pk_criteria::<D>(&pks);
        by_pk.merge(criteria);
        self.find_all(&by_pk).await
    }

    pub async fn find_by_attributes(
        &self,
        attributes: &Map<String, Value>,
        criteria: &Criteria,
    ) -> Result<Option<D>> {
        let mut by_attributes = attribute_criteria(attributes)?;
        by_attributes.merge(criteria);
        self.find(&by_attributes).await
    }

    pub async fn find_all_by_attributes(
        &self,
        attributes: &Map<String, Value>,
        criteria: &Criteria,
    ) -> Result<Vec<D>> {
        let mut by_attributes = attribute_criteria(attributes)?;
        by_attributes.merge(criteria);
        self.find_all(&by_attributes).await
    }

    pub async fn count(&self, criteria: &Criteria) -> Result<u64> {
        let prepared = self.prepare(criteria)?;
        self.connection.count(&prepared).await
    }

    /// Scoped search returning the full response (facets, groups, totals).
    pub async fn search(&self, criteria: &Criteria) -> Result<QueryResponse<D>> {
        let prepared = self.prepare(criteria)?;
        self.connection.search(&prepared).await
    }

    /// Index the record. A changed primary key removes the document stored
    /// under the old key first.
    pub async fn save(&self, record: &D) -> Result<bool> {
        if !self.hooks.before_save(record) {
            return Ok(false);
        }
        let document = record.to_document()?;

        if let (Some(old), Some(current)) = (document.old_primary_key(), document.primary_key()) {
            if old != current {
                if let Some(old_id) = key_to_string(old) {
                    self.connection.delete(DeleteRequest::Id(old_id)).await?;
                }
            }
        }

        let saved = self
            .connection
            .index(IndexRequest::Single(&document), None)
            .await?;
        if saved {
            self.hooks.after_save(record);
        }
        Ok(saved)
    }

    pub async fn delete(&self, record: &D) -> Result<bool> {
        if !self.hooks.before_delete(record) {
            return Ok(false);
        }
        let document = record.to_document()?;
        let deleted = self
            .connection
            .delete(DeleteRequest::Document(&document))
            .await?;
        if deleted {
            self.hooks.after_delete(record);
        }
        Ok(deleted)
    }

    pub async fn commit(&self) -> Result<bool> {
        self.connection.commit().await
    }
}

fn pk_criteria<D: SolrModel>(pks: &[String]) -> Criteria {
    let escaped: Vec<String> = pks.iter().map(|pk| Criteria::escape(pk)).collect();
    let mut criteria = Criteria::new();
    criteria.add_in_condition(D::primary_key(), &escaped, "OR");
    criteria
}

fn attribute_criteria(attributes: &Map<String, Value>) -> Result<Criteria> {
    let mut criteria = Criteria::new();
    for (name, value) in attributes {
        let values: Vec<String> = match value {
            Value::Array(items) => items.iter().map(|v| term(name, v)).collect::<Result<_>>()?,
            other => vec![term(name, other)?],
        };
        criteria.add_in_condition(name, &values, "AND");
    }
    Ok(criteria)
}

fn term(name: &str, value: &Value) -> Result<String> {
    let raw = key_to_string(value).ok_or_else(|| {
        SolrError::invalid_argument(format!("cannot search attribute '{}' by {}", name, value))
    })?;
    Ok(match value {
        Value::String(_) => format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\"")),
        _ => raw,
    })
}
