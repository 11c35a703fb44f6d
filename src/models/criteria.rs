// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Mergeable Solr request criteria.
//!
//! A [`Criteria`] is an ordered list of request parameters plus the names of
//! the scopes to apply. Parameters hold either a single value (overwritten on
//! merge) or a list of values (appended on merge). The free-text query `q` is
//! the one exception: merging two non-empty queries produces
//! `(existing) AND (incoming)` so a base scope's query is never shadowed.

use crate::error::{Result, SolrError};
use serde_json::Value;
use std::fmt;

pub const PARAM_QUERY: &str = "q";
pub const PARAM_FILTER_QUERY: &str = "fq";
pub const PARAM_FIELDS: &str = "fl";
pub const PARAM_ROWS: &str = "rows";
pub const PARAM_START: &str = "start";
pub const PARAM_SORT: &str = "sort";

/// Value of a single request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(v) => vec![v.as_str()],
            ParamValue::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ParamValue::Single(_) => false,
            ParamValue::List(vs) => vs.is_empty(),
        }
    }
}

/// Input to [`Criteria::add_condition`]: one condition or a list joined by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Condition {
    fn from(value: &str) -> Self {
        Condition::One(value.to_string())
    }
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        Condition::One(value)
    }
}

impl From<Vec<String>> for Condition {
    fn from(value: Vec<String>) -> Self {
        Condition::Many(value)
    }
}

impl From<Vec<&str>> for Condition {
    fn from(value: Vec<&str>) -> Self {
        Condition::Many(value.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    params: Vec<(String, ParamValue)>,
    scopes: Vec<String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a criteria from `name => value` properties, as found in scope
    /// definitions loaded from configuration.
    pub fn from_properties(properties: &serde_json::Map<String, Value>) -> Result<Self> {
        let mut criteria = Self::new();
        for (name, value) in properties {
            criteria.set_property(name, value)?;
        }
        Ok(criteria)
    }

    // -----------------------------------------------------------------------
    // Raw parameters
    // -----------------------------------------------------------------------

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn single(&self, name: &str) -> Option<&str> {
        match self.param(name)? {
            ParamValue::Single(v) => Some(v.as_str()),
            ParamValue::List(vs) => vs.last().map(String::as_str),
        }
    }

    fn list(&self, name: &str) -> Vec<&str> {
        self.param(name).map(ParamValue::values).unwrap_or_default()
    }

    /// Set a single-valued parameter, replacing whatever was there.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = ParamValue::Single(value.into());
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name.to_string(), value)),
        }
        self
    }

    /// Append a value to a multi-valued parameter.
    pub fn add_param(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some((_, ParamValue::List(values))) => values.push(value),
            Some(slot) => {
                if let ParamValue::Single(existing) = &slot.1 {
                    slot.1 = ParamValue::List(vec![existing.clone(), value]);
                }
            }
            None => self
                .params
                .push((name.to_string(), ParamValue::List(vec![value]))),
        }
        self
    }

    pub fn remove_param(&mut self, name: &str) -> Option<ParamValue> {
        let index = self.params.iter().position(|(n, _)| n == name)?;
        Some(self.params.remove(index).1)
    }

    // -----------------------------------------------------------------------
    // Core request fields
    // -----------------------------------------------------------------------

    pub fn query(&self) -> Option<&str> {
        self.single(PARAM_QUERY)
    }

    pub fn set_query(&mut self, query: impl Into<String>) -> &mut Self {
        self.set_param(PARAM_QUERY, query)
    }

    pub fn filter_queries(&self) -> Vec<&str> {
        self.list(PARAM_FILTER_QUERY)
    }

    pub fn add_filter_query(&mut self, filter: impl Into<String>) -> &mut Self {
        self.add_param(PARAM_FILTER_QUERY, filter)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.list(PARAM_FIELDS)
    }

    pub fn add_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.add_param(PARAM_FIELDS, field)
    }

    /// Return relevance scores along with the results.
    pub fn with_scores(&mut self) -> &mut Self {
        self.add_field("score")
    }

    pub fn rows(&self) -> Option<u32> {
        self.single(PARAM_ROWS).and_then(|v| v.parse().ok())
    }

    pub fn set_rows(&mut self, rows: u32) -> &mut Self {
        self.set_param(PARAM_ROWS, rows.to_string())
    }

    pub fn start(&self) -> Option<u32> {
        self.single(PARAM_START).and_then(|v| v.parse().ok())
    }

    pub fn set_start(&mut self, start: u32) -> &mut Self {
        self.set_param(PARAM_START, start.to_string())
    }

    /// Alias of [`rows`](Self::rows) for pagination widgets.
    pub fn limit(&self) -> Option<u32> {
        self.rows()
    }

    pub fn set_limit(&mut self, limit: u32) -> &mut Self {
        self.set_rows(limit)
    }

    /// Alias of [`start`](Self::start) for pagination widgets.
    pub fn offset(&self) -> u32 {
        self.start().unwrap_or(0)
    }

    pub fn set_offset(&mut self, offset: u32) -> &mut Self {
        self.set_start(offset)
    }

    pub fn order(&self) -> Option<&str> {
        self.single(PARAM_SORT)
    }

    pub fn set_order(&mut self, order: impl Into<String>) -> &mut Self {
        self.set_param(PARAM_SORT, order)
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn add_scope(&mut self, scope: impl Into<String>) -> &mut Self {
        self.scopes.push(scope.into());
        self
    }

    pub fn set_scopes(&mut self, scopes: Vec<String>) -> &mut Self {
        self.scopes = scopes;
        self
    }

    pub fn clear_scopes(&mut self) -> &mut Self {
        self.scopes.clear();
        self
    }

    // -----------------------------------------------------------------------
    // Facets, grouping, highlighting, debug
    // -----------------------------------------------------------------------

    pub fn set_facet(&mut self, enabled: bool) -> &mut Self {
        self.set_param("facet", enabled.to_string())
    }

    pub fn add_facet_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.set_facet(true).add_param("facet.field", field)
    }

    pub fn add_facet_query(&mut self, query: impl Into<String>) -> &mut Self {
        self.set_facet(true).add_param("facet.query", query)
    }

    pub fn add_facet_date_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.set_facet(true).add_param("facet.date", field)
    }

    pub fn add_facet_range_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.set_facet(true).add_param("facet.range", field)
    }

    pub fn set_facet_limit(&mut self, limit: i32) -> &mut Self {
        self.set_param("facet.limit", limit.to_string())
    }

    pub fn set_facet_min_count(&mut self, min_count: u32) -> &mut Self {
        self.set_param("facet.mincount", min_count.to_string())
    }

    pub fn set_group(&mut self, enabled: bool) -> &mut Self {
        self.set_param("group", enabled.to_string())
    }

    pub fn add_group_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.set_group(true).add_param("group.field", field)
    }

    pub fn add_group_query(&mut self, query: impl Into<String>) -> &mut Self {
        self.set_group(true).add_param("group.query", query)
    }

    pub fn set_group_limit(&mut self, limit: u32) -> &mut Self {
        self.set_param("group.limit", limit.to_string())
    }

    /// Ask Solr for the number of distinct groups (`ngroups`).
    pub fn set_group_ngroups(&mut self, enabled: bool) -> &mut Self {
        self.set_param("group.ngroups", enabled.to_string())
    }

    pub fn set_highlight(&mut self, enabled: bool) -> &mut Self {
        self.set_param("hl", enabled.to_string())
    }

    pub fn add_highlight_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.set_highlight(true).add_param("hl.fl", field)
    }

    pub fn set_highlight_snippets(&mut self, snippets: u32) -> &mut Self {
        self.set_param("hl.snippets", snippets.to_string())
    }

    /// Request the `debug.explain` block used by score analysis.
    pub fn set_show_debug_info(&mut self, enabled: bool) -> &mut Self {
        self.set_param("debugQuery", enabled.to_string())
    }

    // -----------------------------------------------------------------------
    // Condition builders
    // -----------------------------------------------------------------------

    /// Add a filter condition. A list of conditions is parenthesized and
    /// joined with `operator`; an empty list leaves the criteria unchanged.
    pub fn add_condition(&mut self, condition: impl Into<Condition>, operator: &str) -> &mut Self {
        let condition = match condition.into() {
            Condition::One(c) => c,
            Condition::Many(list) if list.is_empty() => return self,
            Condition::Many(list) => {
                format!("({})", list.join(&format!(") {} (", operator)))
            }
        };
        self.add_filter_query(condition)
    }

    /// Add `field:[start TO end]`. Does nothing if either bound is empty.
    pub fn add_between_condition(&mut self, field: &str, start: &str, end: &str) -> &mut Self {
        if start.is_empty() || end.is_empty() {
            return self;
        }
        self.add_filter_query(format!("{}:[{} TO {}]", field, start, end))
    }

    /// `field:v` for one value, `field:(a b)` for several.
    pub fn add_in_condition<S: AsRef<str>>(
        &mut self,
        field: &str,
        values: &[S],
        operator: &str,
    ) -> &mut Self {
        let condition = match values {
            [] => return self,
            [value] => format!("{}:{}", field, value.as_ref()),
            _ => {
                let joined: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
                format!("{}:({})", field, joined.join(" "))
            }
        };
        self.add_condition(condition, operator)
    }

    /// `field:!v` for one value, `field:(!a AND !b)` for several.
    pub fn add_not_in_condition<S: AsRef<str>>(
        &mut self,
        field: &str,
        values: &[S],
        operator: &str,
    ) -> &mut Self {
        let condition = match values {
            [] => return self,
            [value] => format!("{}:!{}", field, value.as_ref()),
            _ => {
                let negated: Vec<String> = values
                    .iter()
                    .map(|v| format!("!{}", v.as_ref()))
                    .collect();
                format!("{}:({})", field, negated.join(" AND "))
            }
        };
        self.add_condition(condition, operator)
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    /// Merge `other` into this criteria.
    ///
    /// * empty values on `other` are skipped
    /// * `q` becomes `(existing) AND (incoming)` when this criteria already has a query
    /// * single values overwrite, list values are appended one by one; a single
    ///   value is appended when this criteria already holds a list for it
    /// * scopes accumulate
    pub fn merge(&mut self, other: &Criteria) -> &mut Self {
        for (name, value) in &other.params {
            if value.is_empty() {
                continue;
            }
            if name == PARAM_QUERY {
                self.merge_query(value);
                continue;
            }
            match value {
                // never drop values already collected in a list
                ParamValue::Single(v) if matches!(self.param(name), Some(ParamValue::List(_))) => {
                    self.add_param(name, v.clone());
                }
                ParamValue::Single(v) => {
                    self.set_param(name, v.clone());
                }
                ParamValue::List(values) => {
                    for v in values {
                        self.add_param(name, v.clone());
                    }
                }
            }
        }
        self.scopes.extend(other.scopes.iter().cloned());
        self
    }

    fn merge_query(&mut self, incoming: &ParamValue) {
        let incoming = match incoming {
            ParamValue::Single(v) => v.as_str(),
            ParamValue::List(vs) => match vs.last() {
                Some(v) => v.as_str(),
                None => return,
            },
        };
        if incoming.is_empty() {
            return;
        }
        let combined = match self.query() {
            Some(existing) if !existing.is_empty() => {
                format!("({}) AND ({})", existing, incoming)
            }
            _ => incoming.to_string(),
        };
        self.set_query(combined);
    }

    /// Backslash-escape characters that carry meaning in the Lucene query syntax.
    pub fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(
                c,
                '\\' | '+'
                    | '-'
                    | '!'
                    | '('
                    | ')'
                    | ':'
                    | '^'
                    | '['
                    | ']'
                    | '"'
                    | '{'
                    | '}'
                    | '~'
                    | '*'
                    | '?'
                    | '|'
                    | '&'
                    | ';'
                    | '/'
            ) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    // -----------------------------------------------------------------------
    // Named properties
    // -----------------------------------------------------------------------

    /// Set a property by name. Unknown names fail with "not defined",
    /// getter-only names with "read only".
    pub fn set_property(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "query" | "q" => {
                self.set_query(value_to_string(name, value)?);
            }
            "order" | "sort" => {
                self.set_order(value_to_string(name, value)?);
            }
            "limit" | "rows" => {
                self.set_rows(value_to_u32(name, value)?);
            }
            "offset" | "start" => {
                self.set_start(value_to_u32(name, value)?);
            }
            "scopes" => {
                self.scopes = value_to_list(name, value)?;
            }
            "filter_queries" | "fq" => {
                for filter in value_to_list(name, value)? {
                    self.add_filter_query(filter);
                }
            }
            "fields" | "fl" => {
                for field in value_to_list(name, value)? {
                    self.add_field(field);
                }
            }
            "params" => return Err(SolrError::read_only("Criteria", name)),
            _ => return Err(SolrError::not_defined("Criteria", name)),
        }
        Ok(())
    }

    /// Flatten into `(name, value)` pairs in insertion order; list parameters
    /// repeat their name.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .flat_map(|(name, value)| {
                value
                    .values()
                    .into_iter()
                    .map(move |v| (name.clone(), v.to_string()))
            })
            .collect()
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.to_query_pairs() {
            serializer.append_pair(&name, &value);
        }
        write!(f, "{}", serializer.finish())
    }
}

fn value_to_string(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(SolrError::invalid_argument(format!(
            "{} must be a string, got: {}",
            name, value
        ))),
    }
}

fn value_to_u32(name: &str, value: &Value) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            SolrError::invalid_argument(format!(
                "{} must be a non-negative integer, got: {}",
                name, value
            ))
        })
}

fn value_to_list(name: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(|v| value_to_string(name, v)).collect(),
        other => Ok(vec![value_to_string(name, other)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_combines_queries_with_and() {
        let mut base = Criteria::new();
        base.set_query("type:book");
        let mut incoming = Criteria::new();
        incoming.set_query("author:pick");

        base.merge(&incoming);
        assert_eq!(base.query(), Some("(type:book) AND (author:pick)"));
    }

    #[test]
    fn test_merge_into_empty_query_takes_incoming() {
        let mut base = Criteria::new();
        let mut incoming = Criteria::new();
        incoming.set_query("author:pick");

        base.merge(&incoming);
        assert_eq!(base.query(), Some("author:pick"));
    }

    #[test]
    fn test_merge_skips_empty_incoming_query() {
        let mut base = Criteria::new();
        base.set_query("*:*");
        let mut incoming = Criteria::new();
        incoming.set_query("");

        base.merge(&incoming);
        assert_eq!(base.query(), Some("*:*"));
    }

    #[test]
    fn test_merge_accumulates_filter_queries_in_order() {
        let mut base = Criteria::new();
        base.add_filter_query("a:1").add_filter_query("b:2");
        let mut incoming = Criteria::new();
        incoming.add_filter_query("c:3").add_filter_query("a:1");

        base.merge(&incoming);
        assert_eq!(base.filter_queries(), vec!["a:1", "b:2", "c:3", "a:1"]);
    }

    #[test]
    fn test_merge_overwrites_single_values() {
        let mut base = Criteria::new();
        base.set_limit(10).set_order("name asc");
        let mut incoming = Criteria::new();
        incoming.set_limit(25);

        base.merge(&incoming);
        assert_eq!(base.limit(), Some(25));
        assert_eq!(base.order(), Some("name asc"));
    }

    #[test]
    fn test_merge_single_value_appends_to_existing_list() {
        let mut base = Criteria::new();
        base.add_filter_query("status:published")
            .add_filter_query("hidden:false");
        let mut incoming = Criteria::new();
        incoming.set_param("fq", "lang:en");

        base.merge(&incoming);
        assert_eq!(
            base.filter_queries(),
            vec!["status:published", "hidden:false", "lang:en"]
        );
    }

    #[test]
    fn test_merge_accumulates_scopes() {
        let mut base = Criteria::new();
        base.add_scope("published");
        let mut incoming = Criteria::new();
        incoming.add_scope("recent");

        base.merge(&incoming);
        assert_eq!(base.scopes(), ["published", "recent"]);
    }

    #[test]
    fn test_merge_does_not_touch_source() {
        let mut base = Criteria::new();
        base.set_query("x");
        let mut incoming = Criteria::new();
        incoming.set_query("y");
        let before = incoming.clone();

        base.merge(&incoming);
        assert_eq!(incoming, before);
    }

    #[test]
    fn test_add_param_promotes_single_to_list() {
        let mut criteria = Criteria::new();
        criteria.set_param("facet.field", "color");
        criteria.add_param("facet.field", "size");
        assert_eq!(
            criteria.param("facet.field"),
            Some(&ParamValue::List(vec!["color".into(), "size".into()]))
        );
    }

    #[test]
    fn test_empty_inputs_are_no_ops() {
        let mut criteria = Criteria::new();
        let empty: [&str; 0] = [];
        criteria.add_in_condition("color", &empty, "AND");
        criteria.add_not_in_condition("color", &empty, "AND");
        criteria.add_condition(Vec::<String>::new(), "AND");
        criteria.add_between_condition("price", "", "x");
        criteria.add_between_condition("price", "1", "");
        assert_eq!(criteria, Criteria::new());
    }

    #[test]
    fn test_in_condition_rendering() {
        let mut criteria = Criteria::new();
        criteria.add_in_condition("color", &["red"], "AND");
        criteria.add_in_condition("color", &["red", "blue"], "AND");
        criteria.add_not_in_condition("color", &["red", "blue"], "AND");
        criteria.add_not_in_condition("color", &["green"], "AND");
        assert_eq!(
            criteria.filter_queries(),
            vec![
                "color:red",
                "color:(red blue)",
                "color:(!red AND !blue)",
                "color:!green"
            ]
        );
    }

    #[test]
    fn test_add_condition_list_joins_with_operator() {
        let mut criteria = Criteria::new();
        criteria.add_condition(vec!["a:1", "b:2"], "OR");
        criteria.add_condition("c:3", "OR");
        assert_eq!(criteria.filter_queries(), vec!["(a:1) OR (b:2)", "c:3"]);
    }

    #[test]
    fn test_between_condition() {
        let mut criteria = Criteria::new();
        criteria.add_between_condition("price", "10", "*");
        assert_eq!(criteria.filter_queries(), vec!["price:[10 TO *]"]);
    }

    #[test]
    fn test_limit_offset_aliases() {
        let mut criteria = Criteria::new();
        assert_eq!(criteria.limit(), None);
        assert_eq!(criteria.offset(), 0);
        criteria.set_limit(5).set_offset(20);
        assert_eq!(criteria.rows(), Some(5));
        assert_eq!(criteria.start(), Some(20));
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(Criteria::escape("a:b"), "a\\:b");
        assert_eq!(Criteria::escape("\"quoted\""), "\\\"quoted\\\"");
        assert_eq!(Criteria::escape("c++ && rust?"), "c\\+\\+ \\&\\& rust\\?");
        assert_eq!(Criteria::escape("plain text"), "plain text");
    }

    #[test]
    fn test_with_scores_adds_score_field() {
        let mut criteria = Criteria::new();
        criteria.add_field("id").with_scores();
        assert_eq!(criteria.fields(), vec!["id", "score"]);
    }

    #[test]
    fn test_set_property_known_names() {
        let criteria = Criteria::from_properties(
            json!({"query": "*:*", "limit": 10, "scopes": ["published"], "fq": ["a:1", "b:2"]})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(criteria.query(), Some("*:*"));
        assert_eq!(criteria.limit(), Some(10));
        assert_eq!(criteria.scopes(), ["published"]);
        assert_eq!(criteria.filter_queries(), vec!["a:1", "b:2"]);
    }

    #[test]
    fn test_set_property_errors() {
        let mut criteria = Criteria::new();
        let err = criteria.set_property("colour", &json!("red")).unwrap_err();
        assert!(matches!(
            err,
            SolrError::Property {
                kind: crate::error::PropertyErrorKind::NotDefined,
                ..
            }
        ));

        let err = criteria.set_property("params", &json!({})).unwrap_err();
        assert!(matches!(
            err,
            SolrError::Property {
                kind: crate::error::PropertyErrorKind::ReadOnly,
                ..
            }
        ));

        assert!(criteria.set_property("limit", &json!(-1)).is_err());
    }

    #[test]
    fn test_display_renders_url_encoded_request() {
        let mut criteria = Criteria::new();
        criteria
            .set_query("name:foo bar")
            .add_filter_query("a:1")
            .add_filter_query("b:2");
        assert_eq!(criteria.to_string(), "q=name%3Afoo+bar&fq=a%3A1&fq=b%3A2");
    }

    #[test]
    fn test_facet_and_group_setters() {
        let mut criteria = Criteria::new();
        criteria
            .add_facet_field("color")
            .add_group_field("author")
            .set_group_limit(3);
        let pairs = criteria.to_query_pairs();
        assert!(pairs.contains(&("facet".into(), "true".into())));
        assert!(pairs.contains(&("facet.field".into(), "color".into())));
        assert!(pairs.contains(&("group".into(), "true".into())));
        assert!(pairs.contains(&("group.field".into(), "author".into())));
        assert!(pairs.contains(&("group.limit".into(), "3".into())));
    }
}
