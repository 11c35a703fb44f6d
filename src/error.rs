// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Error types for the Solr adapter.
//!
//! Backend update failures reported by Solr itself are not errors: `index`,
//! `delete` and `commit` return `Ok(false)` for them. Everything in this enum
//! propagates to the caller unchanged.

use thiserror::Error;

/// Distinguishes the two ways a named property access can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyErrorKind {
    NotDefined,
    ReadOnly,
}

impl std::fmt::Display for PropertyErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyErrorKind::NotDefined => write!(f, "is not defined"),
            PropertyErrorKind::ReadOnly => write!(f, "is read only"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolrError {
    /// Missing or invalid configuration (no backend, unknown scope, bad env value).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Network failure talking to Solr.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Solr answered a query with a non-success status.
    #[error("solr returned status {status}: {message}")]
    Backend { status: u16, message: String },

    /// Response body was not valid JSON.
    #[error("invalid response payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A model attribute could not be converted to or from its wire form.
    #[error("cannot map attribute '{attribute}': {message}")]
    Mapping { attribute: String, message: String },

    #[error("property \"{class}.{property}\" {kind}")]
    Property {
        class: String,
        property: String,
        kind: PropertyErrorKind,
    },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl SolrError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        SolrError::Config {
            message: message.into(),
        }
    }

    pub fn mapping<A: Into<String>, M: Into<String>>(attribute: A, message: M) -> Self {
        SolrError::Mapping {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn not_defined<C: Into<String>, P: Into<String>>(class: C, property: P) -> Self {
        SolrError::Property {
            class: class.into(),
            property: property.into(),
            kind: PropertyErrorKind::NotDefined,
        }
    }

    pub fn read_only<C: Into<String>, P: Into<String>>(class: C, property: P) -> Self {
        SolrError::Property {
            class: class.into(),
            property: property.into(),
            kind: PropertyErrorKind::ReadOnly,
        }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        SolrError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        SolrError::InvalidOperation {
            message: message.into(),
        }
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, SolrError>;
