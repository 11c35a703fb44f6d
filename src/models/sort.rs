// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Logical sort attributes and how they are applied to a [`Criteria`].
//!
//! A sortable attribute resolves either to a plain field (`price`,
//! `price DESC`), to explicit order expressions per direction, or to a set of
//! request parameters per direction. The last form drives function-query
//! ranking: one parameter is the `sort` directive itself and the others are
//! variables that directive references, e.g.
//!
//! ```text
//! desc => { sort: "product($boost,score) desc", boost: "recip(ms(NOW,created),3.16e-11,1,1)" }
//! ```

use crate::error::{Result, SolrError};
use crate::models::criteria::Criteria;

/// What one direction of a virtual sort attribute expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortClause {
    /// Literal order expression appended to `sort`
    Order(String),
    /// Request parameters set verbatim on the criteria
    Params(Vec<(String, String)>),
}

impl From<&str> for SortClause {
    fn from(value: &str) -> Self {
        SortClause::Order(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortDefinition {
    /// Sort on this field name
    Field(String),
    Directional {
        asc: Option<SortClause>,
        desc: Option<SortClause>,
    },
}

/// One entry of the explicit sortable-attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortAttribute {
    /// A model attribute sortable under its own name
    Name(String),
    /// Any attribute the model declares
    Any,
    /// A virtual attribute with its own definition
    Virtual {
        name: String,
        definition: SortDefinition,
    },
}

impl SortAttribute {
    pub fn name(name: impl Into<String>) -> Self {
        SortAttribute::Name(name.into())
    }

    pub fn virtual_field(name: impl Into<String>, field: impl Into<String>) -> Self {
        SortAttribute::Virtual {
            name: name.into(),
            definition: SortDefinition::Field(field.into()),
        }
    }

    pub fn directional(
        name: impl Into<String>,
        asc: Option<SortClause>,
        desc: Option<SortClause>,
    ) -> Self {
        SortAttribute::Virtual {
            name: name.into(),
            definition: SortDefinition::Directional { asc, desc },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    attributes: Vec<SortAttribute>,
    model_attributes: Vec<String>,
    default_order: Option<String>,
    multi_sort: bool,
    /// Requested `(attribute, descending)` pairs in priority order
    directions: Vec<(String, bool)>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sort that falls back to the attribute names a model declares.
    pub fn for_model<I, S>(model_attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model_attributes: model_attributes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<SortAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_default_order(mut self, order: impl Into<String>) -> Self {
        self.default_order = Some(order.into());
        self
    }

    pub fn with_multi_sort(mut self, multi_sort: bool) -> Self {
        self.multi_sort = multi_sort;
        self
    }

    pub fn directions(&self) -> &[(String, bool)] {
        &self.directions
    }

    /// Request a sort on `attribute`. Unresolvable attributes are ignored;
    /// without multi-sort the new direction replaces the previous ones.
    pub fn add_direction(&mut self, attribute: impl Into<String>, descending: bool) -> &mut Self {
        let attribute = attribute.into();
        if self.resolve_attribute(&attribute).is_none() {
            return self;
        }
        if !self.multi_sort {
            self.directions.clear();
        }
        self.directions.retain(|(name, _)| *name != attribute);
        self.directions.push((attribute, descending));
        self
    }

    /// Parse the widget's sort variable, e.g. `popularity.desc-name`.
    pub fn parse_directions(&mut self, raw: &str) -> &mut Self {
        for part in raw.split('-').filter(|p| !p.is_empty()) {
            let (attribute, descending) = match part.strip_suffix(".desc") {
                Some(attribute) => (attribute, true),
                None => (part.strip_suffix(".asc").unwrap_or(part), false),
            };
            self.add_direction(attribute, descending);
            if !self.multi_sort {
                break;
            }
        }
        self
    }

    /// Resolve a requested attribute name to its definition.
    ///
    /// An explicit attribute list takes precedence over the model's own
    /// attribute names; `*` in the list accepts any model attribute.
    pub fn resolve_attribute(&self, attribute: &str) -> Option<SortDefinition> {
        if self.attributes.is_empty() {
            return self
                .model_attributes
                .iter()
                .find(|name| *name == attribute)
                .map(|name| SortDefinition::Field(name.clone()));
        }
        for entry in &self.attributes {
            match entry {
                SortAttribute::Virtual { name, definition } if name == attribute => {
                    return Some(definition.clone());
                }
                SortAttribute::Any if self.model_attributes.iter().any(|n| n == attribute) => {
                    return Some(SortDefinition::Field(attribute.to_string()));
                }
                SortAttribute::Name(name) if name == attribute => {
                    return Some(SortDefinition::Field(name.clone()));
                }
                _ => {}
            }
        }
        None
    }

    fn resolved_clauses(&self) -> Vec<SortClause> {
        self.directions
            .iter()
            .filter_map(|(attribute, descending)| {
                let clause = match self.resolve_attribute(attribute)? {
                    SortDefinition::Field(field) => SortClause::Order(plain_order(&field, *descending)),
                    SortDefinition::Directional { asc, desc } => {
                        let clause = if *descending { desc } else { asc };
                        clause.unwrap_or_else(|| SortClause::Order(plain_order(attribute, *descending)))
                    }
                };
                Some(clause)
            })
            .collect()
    }

    /// Render the comma-joined order string.
    ///
    /// Fails when a requested direction expands to request parameters: those
    /// have no literal order-by form and must go through [`apply_order`](Self::apply_order).
    pub fn order_by(&self) -> Result<String> {
        if self.directions.is_empty() {
            return Ok(self.default_order.clone().unwrap_or_default());
        }
        let mut orders = Vec::new();
        for clause in self.resolved_clauses() {
            match clause {
                SortClause::Order(order) => orders.push(order),
                SortClause::Params(_) => {
                    return Err(SolrError::invalid_operation(
                        "sort expands to request parameters and has no literal order-by form",
                    ))
                }
            }
        }
        Ok(orders.join(", "))
    }

    /// Apply the requested sort to `criteria`.
    pub fn apply_order(&self, criteria: &mut Criteria) {
        if self.directions.is_empty() {
            if let Some(order) = &self.default_order {
                criteria.set_order(order.clone());
            }
            return;
        }
        let mut orders = Vec::new();
        for clause in self.resolved_clauses() {
            match clause {
                SortClause::Order(order) => orders.push(order),
                SortClause::Params(params) => {
                    for (name, value) in params {
                        criteria.set_param(&name, value);
                    }
                }
            }
        }
        if !orders.is_empty() {
            criteria.set_order(orders.join(", "));
        }
    }
}

fn plain_order(field: &str, descending: bool) -> String {
    if descending {
        format!("{} DESC", field)
    } else {
        field.to_string()
    }
}
