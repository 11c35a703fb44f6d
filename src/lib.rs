// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Solr search adapter: criteria building, document mapping, read/write
//! connections and decoded query responses.

pub mod error;
pub mod models;
pub mod services;

pub use error::{Result, SolrError};
