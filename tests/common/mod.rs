// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! In-memory Solr double shared by the integration tests.
//!
//! Understands just enough of the select syntax for the tests: `*:*`,
//! `field:value`, `field:(a b)`, `(x) AND (y)`, one `sort` clause and
//! `rows`/`start`. Added documents become visible on commit.

#![allow(dead_code)]

use async_trait::async_trait;
use lala_solr::models::config::{ClientOptions, ConnectionConfig};
use lala_solr::models::document::InputDocument;
use lala_solr::services::client::{ClientFactory, SolrClient, UpdateResponse};
use lala_solr::services::connection::Connection;
use lala_solr::Result;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Add { count: usize, commit_within: u64 },
    Delete(Vec<String>),
    Commit,
}

pub type MemoryConnection = Connection<MemoryFactory>;

#[derive(Debug, Default)]
pub struct Store {
    /// Unique key field, `id` when unset
    pub unique_key: Option<String>,
    committed: Vec<Map<String, Value>>,
    pending: Vec<Map<String, Value>>,
    pending_deletes: Vec<String>,
    pub updates: Vec<Update>,
    /// (handle id, params) for every select
    pub queries: Vec<(usize, Vec<(String, String)>)>,
    pub reject_updates: bool,
    /// Extra top-level sections merged into every select response
    pub extra_sections: Map<String, Value>,
}

/// A Solr core living in memory.
#[derive(Clone, Default)]
pub struct MemorySolr {
    store: Arc<Mutex<Store>>,
    handles_created: Arc<AtomicUsize>,
}

impl MemorySolr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> MemoryFactory {
        MemoryFactory {
            solr: self.clone(),
        }
    }

    pub fn with_unique_key(self, field: &str) -> Self {
        self.store.lock().unique_key = Some(field.to_string());
        self
    }

    pub fn connection(&self) -> MemoryConnection {
        let options = ClientOptions::new("memory", 8983, "/solr/test");
        Connection::new(ConnectionConfig::new(options), self.factory())
    }

    pub fn handles_created(&self) -> usize {
        self.handles_created.load(AtomicOrdering::SeqCst)
    }

    pub fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> T) -> T {
        f(&mut self.store.lock())
    }

    pub fn committed_count(&self) -> usize {
        self.store.lock().committed.len()
    }

    pub fn committed(&self) -> Vec<Map<String, Value>> {
        self.store.lock().committed.clone()
    }

    pub fn updates(&self) -> Vec<Update> {
        self.store.lock().updates.clone()
    }

    pub fn queries(&self) -> Vec<(usize, Vec<(String, String)>)> {
        self.store.lock().queries.clone()
    }

    pub fn last_query_param(&self, name: &str) -> Option<String> {
        let store = self.store.lock();
        let (_, params) = store.queries.last()?;
        params
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

#[derive(Clone)]
pub struct MemoryFactory {
    solr: MemorySolr,
}

impl ClientFactory for MemoryFactory {
    type Client = MemoryClient;

    fn create(&self, _options: &ClientOptions) -> Result<MemoryClient> {
        let id = self.solr.handles_created.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        Ok(MemoryClient {
            id,
            store: Arc::clone(&self.solr.store),
        })
    }
}

pub struct MemoryClient {
    id: usize,
    store: Arc<Mutex<Store>>,
}

fn update_response(store: &Store) -> UpdateResponse {
    let status = if store.reject_updates { 400 } else { 0 };
    UpdateResponse::from_payload(200, json!({"responseHeader": {"status": status}}))
}

#[async_trait]
impl SolrClient for MemoryClient {
    async fn add_document(
        &self,
        document: &InputDocument,
        overwrite: bool,
        commit_within: u64,
    ) -> Result<UpdateResponse> {
        self.add_documents(std::slice::from_ref(document), overwrite, commit_within)
            .await
    }

    async fn add_documents(
        &self,
        documents: &[InputDocument],
        _overwrite: bool,
        commit_within: u64,
    ) -> Result<UpdateResponse> {
        let mut store = self.store.lock();
        store.updates.push(Update::Add {
            count: documents.len(),
            commit_within,
        });
        if !store.reject_updates {
            for document in documents {
                if let Value::Object(fields) = document.to_json() {
                    store.pending.push(fields);
                }
            }
        }
        Ok(update_response(&store))
    }

    async fn delete_by_id(&self, id: &str) -> Result<UpdateResponse> {
        self.delete_by_ids(&[id.to_string()]).await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<UpdateResponse> {
        let mut store = self.store.lock();
        store.updates.push(Update::Delete(ids.to_vec()));
        if !store.reject_updates {
            store.pending_deletes.extend(ids.iter().cloned());
        }
        Ok(update_response(&store))
    }

    async fn commit(&self) -> Result<UpdateResponse> {
        let mut store = self.store.lock();
        store.updates.push(Update::Commit);

        let key = store.unique_key.clone().unwrap_or_else(|| "id".to_string());
        let pending = std::mem::take(&mut store.pending);
        for doc in pending {
            if let Some(id) = doc.get(&key).cloned() {
                store.committed.retain(|existing| existing.get(&key) != Some(&id));
            }
            store.committed.push(doc);
        }
        let deletes = std::mem::take(&mut store.pending_deletes);
        store.committed.retain(|doc| {
            let id = doc.get(&key).map(term_string).unwrap_or_default();
            !deletes.contains(&id)
        });
        Ok(update_response(&store))
    }

    async fn query(&self, params: &[(String, String)]) -> Result<Value> {
        let mut store = self.store.lock();
        store.queries.push((self.id, params.to_vec()));

        let param = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };
        let mut matched: Vec<&Map<String, Value>> = store
            .committed
            .iter()
            .filter(|doc| param("q").map_or(true, |q| matches(doc, q)))
            .filter(|doc| {
                params
                    .iter()
                    .filter(|(n, _)| n == "fq")
                    .all(|(_, fq)| matches(doc, fq))
            })
            .collect();

        if let Some(sort) = param("sort") {
            let mut parts = sort.split_whitespace();
            let field = parts.next().unwrap_or_default();
            let descending = parts
                .next()
                .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
            matched.sort_by(|a, b| {
                let ordering = compare(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let num_found = matched.len();
        let start: usize = param("start").and_then(|s| s.parse().ok()).unwrap_or(0);
        let rows: usize = param("rows").and_then(|s| s.parse().ok()).unwrap_or(10);
        let docs: Vec<Value> = matched
            .into_iter()
            .skip(start)
            .take(rows)
            .map(|doc| Value::Object(doc.clone()))
            .collect();

        let mut payload = json!({
            "responseHeader": {"status": 0},
            "response": {"numFound": num_found, "start": start, "docs": docs}
        });
        if let Value::Object(sections) = &mut payload {
            for (name, section) in &store.extra_sections {
                sections.insert(name.clone(), section.clone());
            }
        }
        Ok(payload)
    }
}

fn term_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unescape(term: &str) -> String {
    let term = term.trim_matches('"');
    let mut out = String::with_capacity(term.len());
    let mut chars = term.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn matches(doc: &Map<String, Value>, expr: &str) -> bool {
    let expr = expr.trim();
    if expr == "*:*" {
        return true;
    }
    if let Some(inner) = expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        if inner.contains(") AND (") {
            return inner.split(") AND (").all(|part| matches(doc, part));
        }
        if !inner.contains(':') || inner.contains(") OR (") {
            return inner.split(") OR (").any(|part| matches(doc, part));
        }
        return matches(doc, inner);
    }
    let Some((field, term)) = expr.split_once(':') else {
        return false;
    };
    let wanted: Vec<String> = match term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(list) => list.split_whitespace().map(unescape).collect(),
        None => vec![unescape(term)],
    };
    match doc.get(field) {
        Some(Value::Array(values)) => values.iter().any(|v| wanted.contains(&term_string(v))),
        Some(value) => wanted.contains(&term_string(value)),
        None => false,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => term_string(x).cmp(&term_string(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
