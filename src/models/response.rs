// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Decoded view over a raw Solr select response.
//!
//! The payload is kept as-is and every section (results, groups, facets) is
//! decoded on first access and memoized. Facets are untyped and live on the
//! shared [`RawResponse`], so every typed view of the same payload shares one
//! facet decode.

use crate::error::{Result, SolrError};
use crate::models::criteria::Criteria;
use crate::models::document::{Document, Highlights};
use crate::services::record::SolrModel;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FacetKind {
    Date,
    Field,
    Query,
    Range,
}

/// One facet: a field, query, date or range facet with its counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    name: String,
    kind: FacetKind,
    values: Map<String, Value>,
}

impl Facet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FacetKind {
        self.kind
    }

    /// Term (or bucket) → value. Scalar facets are stored under `value`.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn count(&self, term: &str) -> Option<u64> {
        self.values.get(term).and_then(Value::as_u64)
    }
}

#[derive(Debug, Default)]
pub struct FacetSet {
    date: BTreeMap<String, Facet>,
    field: BTreeMap<String, Facet>,
    query: BTreeMap<String, Facet>,
    range: BTreeMap<String, Facet>,
}

impl FacetSet {
    fn decode(payload: &Value) -> Self {
        let Some(counts) = payload.get("facet_counts") else {
            return Self::default();
        };
        Self {
            date: decode_facets(counts.get("facet_dates"), FacetKind::Date),
            field: decode_facets(counts.get("facet_fields"), FacetKind::Field),
            query: decode_facets(counts.get("facet_queries"), FacetKind::Query),
            range: decode_facets(counts.get("facet_ranges"), FacetKind::Range),
        }
    }

    pub fn get(&self, kind: FacetKind) -> &BTreeMap<String, Facet> {
        match kind {
            FacetKind::Date => &self.date,
            FacetKind::Field => &self.field,
            FacetKind::Query => &self.query,
            FacetKind::Range => &self.range,
        }
    }
}

fn decode_facets(section: Option<&Value>, kind: FacetKind) -> BTreeMap<String, Facet> {
    let Some(Value::Object(entries)) = section else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .map(|(name, value)| {
            let facet = Facet {
                name: name.clone(),
                kind,
                values: facet_values(value),
            };
            (name.clone(), facet)
        })
        .collect()
}

/// Solr returns term counts either as a flat `[term, n, term, n]` list or as
/// an object. Scalars (query facets) are wrapped as `{"value": n}`.
fn facet_values(value: &Value) -> Map<String, Value> {
    match value {
        Value::Array(flat) => flat
            .chunks(2)
            .filter_map(|pair| match pair {
                [Value::String(term), count] => Some((term.clone(), count.clone())),
                _ => None,
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                // range facets nest their buckets under "counts"
                let v = match (k.as_str(), v) {
                    ("counts", Value::Array(_)) => Value::Object(facet_values(v)),
                    _ => v.clone(),
                };
                (k.clone(), v)
            })
            .collect(),
        scalar => {
            let mut map = Map::new();
            map.insert("value".to_string(), scalar.clone());
            map
        }
    }
}

/// The untyped payload plus the criteria that produced it.
#[derive(Debug)]
pub struct RawResponse {
    payload: Value,
    criteria: Criteria,
    facets: OnceCell<FacetSet>,
}

impl RawResponse {
    pub fn new(payload: Value, criteria: Criteria) -> Self {
        Self {
            payload,
            criteria,
            facets: OnceCell::new(),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn num_found(&self) -> u64 {
        self.payload
            .pointer("/response/numFound")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn facets(&self) -> &FacetSet {
        self.facets.get_or_init(|| FacetSet::decode(&self.payload))
    }

    fn docs(&self) -> &[Value] {
        self.payload
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn highlighting(&self) -> Option<&Map<String, Value>> {
        self.payload.get("highlighting").and_then(Value::as_object)
    }
}

/// Decoded documents with the total match count.
#[derive(Debug, Clone)]
pub struct ResultList<D> {
    total: u64,
    items: Vec<D>,
}

impl<D> ResultList<D> {
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn items(&self) -> &[D] {
        &self.items
    }

    pub fn into_items(self) -> Vec<D> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, D> {
        self.items.iter()
    }
}

impl<D> IntoIterator for ResultList<D> {
    type Item = D;
    type IntoIter = std::vec::IntoIter<D>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// One value bucket of a field group.
#[derive(Debug, Clone)]
pub struct GroupBucket<D> {
    pub value: Value,
    pub total: u64,
    pub results: Vec<D>,
}

#[derive(Debug, Clone)]
pub struct Group<D> {
    pub name: String,
    /// Documents matching the query before grouping
    pub total: u64,
    /// Number of distinct groups, when requested with `group.ngroups`
    pub ngroups: Option<u64>,
    /// Documents of a query group (or of the `simple` group format)
    pub results: Vec<D>,
    pub buckets: Vec<GroupBucket<D>>,
}

/// Typed view over a [`RawResponse`].
#[derive(Debug)]
pub struct QueryResponse<D = Document> {
    inner: Arc<RawResponse>,
    results: OnceCell<ResultList<D>>,
    groups: OnceCell<BTreeMap<String, Group<D>>>,
}

impl<D: SolrModel> QueryResponse<D> {
    pub fn new(payload: Value, criteria: Criteria) -> Self {
        Self::from_raw(Arc::new(RawResponse::new(payload, criteria)))
    }

    pub fn from_raw(inner: Arc<RawResponse>) -> Self {
        Self {
            inner,
            results: OnceCell::new(),
            groups: OnceCell::new(),
        }
    }

    pub fn raw(&self) -> &Arc<RawResponse> {
        &self.inner
    }

    pub fn payload(&self) -> &Value {
        self.inner.payload()
    }

    pub fn criteria(&self) -> &Criteria {
        self.inner.criteria()
    }

    pub fn total(&self) -> u64 {
        self.inner.num_found()
    }

    /// Decoded result documents. Decoded once; later calls return the same list.
    pub fn results(&self) -> Result<&ResultList<D>> {
        self.results.get_or_try_init(|| self.decode_results())
    }

    pub fn into_results(self) -> Result<ResultList<D>> {
        match self.results.into_inner() {
            Some(results) => Ok(results),
            None => {
                let view = Self::from_raw(self.inner);
                view.decode_results()
            }
        }
    }

    fn decode_results(&self) -> Result<ResultList<D>> {
        Ok(ResultList {
            total: self.inner.num_found(),
            items: self.decode_rows(self.inner.docs())?,
        })
    }

    /// Row population shared by plain results and group doclists: position
    /// is the row index plus the request offset, highlights are attached by
    /// row index.
    fn decode_rows(&self, docs: &[Value]) -> Result<Vec<D>> {
        let highlighting = self.inner.highlighting();
        decode_docs(&self.inner, docs, self.criteria().offset(), |index| {
            // Solr keys highlights by id; they are matched by position here
            highlighting
                .and_then(|h| h.values().nth(index))
                .map(decode_highlights)
        })
    }

    /// Groups keyed by group field or group query. Empty when the request
    /// was not grouped.
    pub fn groups(&self) -> Result<&BTreeMap<String, Group<D>>> {
        self.groups.get_or_try_init(|| self.decode_groups())
    }

    fn decode_groups(&self) -> Result<BTreeMap<String, Group<D>>> {
        let Some(Value::Object(grouped)) = self.inner.payload().get("grouped") else {
            return Ok(BTreeMap::new());
        };
        let mut groups = BTreeMap::new();
        for (name, block) in grouped {
            let results = match block.get("doclist") {
                Some(doclist) => self.decode_doclist(doclist)?.1,
                None => Vec::new(),
            };
            let mut buckets = Vec::new();
            for bucket in block.get("groups").and_then(Value::as_array).into_iter().flatten() {
                let (total, results) = match bucket.get("doclist") {
                    Some(doclist) => self.decode_doclist(doclist)?,
                    None => (0, Vec::new()),
                };
                buckets.push(GroupBucket {
                    value: bucket.get("groupValue").cloned().unwrap_or(Value::Null),
                    total,
                    results,
                });
            }
            let group = Group {
                name: name.clone(),
                total: block.get("matches").and_then(Value::as_u64).unwrap_or(0),
                ngroups: block.get("ngroups").and_then(Value::as_u64),
                results,
                buckets,
            };
            groups.insert(name.clone(), group);
        }
        Ok(groups)
    }

    fn decode_doclist(&self, doclist: &Value) -> Result<(u64, Vec<D>)> {
        let total = doclist.get("numFound").and_then(Value::as_u64).unwrap_or(0);
        let docs = doclist
            .get("docs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok((total, self.decode_rows(docs)?))
    }

    pub fn date_facets(&self) -> &BTreeMap<String, Facet> {
        self.inner.facets().get(FacetKind::Date)
    }

    pub fn field_facets(&self) -> &BTreeMap<String, Facet> {
        self.inner.facets().get(FacetKind::Field)
    }

    pub fn query_facets(&self) -> &BTreeMap<String, Facet> {
        self.inner.facets().get(FacetKind::Query)
    }

    pub fn range_facets(&self) -> &BTreeMap<String, Facet> {
        self.inner.facets().get(FacetKind::Range)
    }

    /// The `debugQuery` explanation for the document with this id.
    pub fn score_analysis(&self, id: &str) -> Option<&Value> {
        self.inner.payload().pointer("/debug/explain")?.get(id)
    }

    /// Re-view the same payload decoded as another model type.
    pub fn with_type<E: SolrModel>(&self) -> QueryResponse<E> {
        QueryResponse::from_raw(Arc::clone(&self.inner))
    }
}

fn decode_docs<D, H>(
    raw: &Arc<RawResponse>,
    docs: &[Value],
    offset: u32,
    highlights_for: H,
) -> Result<Vec<D>>
where
    D: SolrModel,
    H: Fn(usize) -> Option<Highlights>,
{
    let mapping = D::attribute_mapping();
    let mut items = Vec::with_capacity(docs.len());
    for (index, row) in docs.iter().enumerate() {
        let row = row
            .as_object()
            .ok_or_else(|| SolrError::mapping("response.docs", "result row is not an object"))?;
        let mut document = Document::from_wire_row(row, D::primary_key(), &mapping);
        document.set_position(index + offset as usize);
        document.set_solr_response(Arc::clone(raw));
        if let Some(highlights) = highlights_for(index) {
            document.set_highlights(highlights);
        }
        items.push(D::populate(document)?);
    }
    Ok(items)
}

fn decode_highlights(value: &Value) -> Highlights {
    let Some(fields) = value.as_object() else {
        return Highlights::new();
    };
    fields
        .iter()
        .map(|(field, fragments)| {
            let fragments = match fragments {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect(),
                Value::String(single) => vec![single.clone()],
                _ => Vec::new(),
            };
            (field.clone(), fragments)
        })
        .collect()
}
