// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Keeps a host record (usually a database row) mirrored into Solr.
//!
//! Attributes are addressed by model path. A dotted path such as
//! `author.name` reads through a relation and is stored in the document as
//! `author__name`; decoding reverses this into nested relation groups.

use crate::error::Result;
use crate::models::criteria::Criteria;
use crate::models::document::Document;
use crate::services::connection::SolrConnection;
use crate::services::record::Repository;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

/// A record that can be mirrored into Solr.
pub trait SearchableRecord: Sized {
    fn attribute_names() -> Vec<String>;

    /// Value at a model path. `None` when a relation on the path is missing.
    fn read_attribute(&self, path: &str) -> Option<Value>;

    /// Build a record from its own attributes plus related records' attributes
    /// grouped by relation name.
    fn populate_record(attributes: Map<String, Value>, relations: Map<String, Value>) -> Result<Self>;
}

/// Attribute values as last indexed (or loaded), used to skip no-op reindexing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    values: HashMap<String, Value>,
}

impl IndexSnapshot {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }
}

pub struct Searchable<R, C> {
    repository: Repository<Document, C>,
    /// (model path, document attribute) pairs
    attributes: Option<Vec<(String, String)>>,
    auto_index: bool,
    smart_index: bool,
    criteria: Option<Criteria>,
    _record: PhantomData<fn() -> R>,
}

impl<R: SearchableRecord, C: SolrConnection> Searchable<R, C> {
    pub fn new(repository: Repository<Document, C>) -> Self {
        Self {
            repository,
            attributes: None,
            auto_index: true,
            smart_index: true,
            criteria: None,
            _record: PhantomData,
        }
    }

    /// Attributes to index. Entries are either `name` or `(model path, document attribute)`.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<S>)>,
        S: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(path, field)| {
                let path = path.into();
                let field = field.map(Into::into).unwrap_or_else(|| path.clone());
                (path, field)
            })
            .collect();
        self.attributes = Some(attributes);
        self
    }

    pub fn with_auto_index(mut self, auto_index: bool) -> Self {
        self.auto_index = auto_index;
        self
    }

    pub fn with_smart_index(mut self, smart_index: bool) -> Self {
        self.smart_index = smart_index;
        self
    }

    pub fn repository(&self) -> &Repository<Document, C> {
        &self.repository
    }

    /// Configured attributes, defaulting to every attribute the record declares.
    pub fn attributes(&self) -> Vec<(String, String)> {
        match &self.attributes {
            Some(attributes) => attributes.clone(),
            None => R::attribute_names()
                .into_iter()
                .map(|name| (name.clone(), name))
                .collect(),
        }
    }

    /// Document attribute name for a model path (`a.b` → `a__b`).
    pub fn resolve_attribute_name(&self, path: &str) -> String {
        let field = self
            .attributes()
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, field)| field)
            .unwrap_or_else(|| path.to_string());
        field.replace('.', "__")
    }

    pub fn solr_document(&self, record: &R) -> Document {
        let mut document = Document::new();
        for (path, field) in self.attributes() {
            if let Some(value) = record.read_attribute(&path) {
                document.set(field.replace('.', "__"), value);
            }
        }
        document
    }

    fn snapshot(&self, record: &R) -> IndexSnapshot {
        let values = self
            .attributes()
            .into_iter()
            .filter_map(|(path, _)| record.read_attribute(&path).map(|value| (path, value)))
            .collect();
        IndexSnapshot { values }
    }

    /// Index the record now and refresh the snapshot.
    pub async fn index(&self, record: &R, snapshot: &mut IndexSnapshot) -> Result<bool> {
        let document = self.solr_document(record);
        if !self.repository.save(&document).await? {
            return Ok(false);
        }
        *snapshot = self.snapshot(record);
        Ok(true)
    }

    /// Snapshot a freshly loaded record. Empty when smart indexing is off.
    pub fn after_find(&self, record: &R) -> IndexSnapshot {
        if self.smart_index {
            self.snapshot(record)
        } else {
            IndexSnapshot::default()
        }
    }

    /// Whether any indexed attribute changed since the snapshot was taken.
    pub fn is_modified(&self, record: &R, snapshot: &IndexSnapshot) -> bool {
        if !self.smart_index || snapshot.is_empty() {
            return true;
        }
        self.attributes().iter().any(|(path, _)| {
            match (snapshot.get(path), record.read_attribute(path)) {
                (Some(old), Some(current)) => *old != current,
                _ => true,
            }
        })
    }

    /// Reindex after the host saved the record, when auto indexing is on and
    /// something changed. Returns whether it indexed.
    pub async fn after_save(&self, record: &R, snapshot: &mut IndexSnapshot) -> Result<bool> {
        if !self.auto_index || !self.is_modified(record, snapshot) {
            debug!("Record unchanged, skipping reindex");
            return Ok(false);
        }
        self.index(record, snapshot).await
    }

    pub async fn after_delete(&self, record: &R) -> Result<bool> {
        self.repository.delete(&self.solr_document(record)).await
    }

    // -----------------------------------------------------------------------
    // Finders
    // -----------------------------------------------------------------------

    pub fn solr_criteria(&self) -> Criteria {
        self.criteria.clone().unwrap_or_default()
    }

    pub fn set_solr_criteria(&mut self, criteria: Criteria) -> &mut Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn reset_scope(&mut self) -> &mut Self {
        self.criteria = None;
        self
    }

    fn search_criteria(&self, criteria: Option<&Criteria>) -> Criteria {
        let mut merged = Criteria::new();
        merged.merge(&self.solr_criteria());
        if let Some(criteria) = criteria {
            merged.merge(criteria);
        }
        if merged.query().map_or(true, str::is_empty) {
            merged.set_query("*:*");
        }
        merged
    }

    pub async fn find_by_solr(&self, criteria: Option<&Criteria>) -> Result<Option<R>> {
        let search = self.search_criteria(criteria);
        match self.repository.find(&search).await? {
            Some(document) => Ok(Some(self.populate_from_solr(&document)?)),
            None => Ok(None),
        }
    }

    pub async fn find_all_by_solr(&self, criteria: Option<&Criteria>) -> Result<Vec<R>> {
        let search = self.search_criteria(criteria);
        self.repository
            .find_all(&search)
            .await?
            .iter()
            .map(|document| self.populate_from_solr(document))
            .collect()
    }

    /// Build a record from a document, regrouping `relation.attribute` paths.
    pub fn populate_from_solr(&self, document: &Document) -> Result<R> {
        let mut attributes = Map::new();
        let mut relations = Map::new();

        for (path, _) in self.attributes() {
            let value = document
                .get(&self.resolve_attribute_name(&path))
                .cloned()
                .unwrap_or(Value::Null);

            let mut pointers: Vec<&str> = path.split('.').collect();
            let Some(last) = pointers.pop() else {
                continue;
            };
            if pointers.is_empty() {
                attributes.insert(path.clone(), value);
                continue;
            }
            insert_path(&mut relations, &pointers, last, value);
        }

        R::populate_record(attributes, relations)
    }
}

fn insert_path(target: &mut Map<String, Value>, pointers: &[&str], last: &str, value: Value) {
    match pointers.split_first() {
        None => {
            target.insert(last.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(next) = entry {
                insert_path(next, rest, last, value);
            }
        }
    }
}
