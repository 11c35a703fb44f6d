// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lala_solr::models::config::LoadBalancerConfig;
use lala_solr::models::criteria::Criteria;
use lala_solr::models::document::Document;
use lala_solr::services::client::HttpClientFactory;
use lala_solr::services::connection::{
    Connection, DeleteRequest, IndexRequest, Indexable, SolrConnection,
};
use lala_solr::services::load_balancer::LoadBalancer;
use lala_solr::services::logging::init_tracing;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

// Version is extracted from Cargo.toml at compile time via build.rs
const VERSION: &str = env!("LALA_SOLR_VERSION");

type Backend = LoadBalancer<Connection<HttpClientFactory>>;

#[derive(Parser, Debug)]
#[command(name = "lala-solr", version = VERSION)]
#[command(about = "Query and update a Solr core")]
struct Cli {
    /// JSON file with `read_connection` / `write_connection`; SOLR_* env vars otherwise
    #[arg(long, env = "LALA_SOLR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query and print the decoded results
    Search(QueryArgs),
    /// Print the number of matching documents
    Count(QueryArgs),
    /// Index documents from a JSON file (an object or an array of objects)
    Index {
        file: PathBuf,
        #[arg(long)]
        commit_within: Option<u64>,
        #[arg(long)]
        commit: bool,
    },
    /// Delete documents by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        commit: bool,
    },
    Commit,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(short, long, default_value = "*:*")]
    query: String,
    #[arg(long = "fq")]
    filter_queries: Vec<String>,
    #[arg(long = "fl")]
    fields: Vec<String>,
    #[arg(long)]
    rows: Option<u32>,
    #[arg(long)]
    start: Option<u32>,
    #[arg(long)]
    sort: Option<String>,
    #[arg(long = "facet-field")]
    facet_fields: Vec<String>,
    /// Include relevance scores
    #[arg(long)]
    scores: bool,
}

impl QueryArgs {
    fn to_criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        criteria.set_query(self.query.as_str());
        for filter in &self.filter_queries {
            criteria.add_filter_query(filter.as_str());
        }
        for field in &self.fields {
            criteria.add_field(field.as_str());
        }
        if self.scores {
            criteria.with_scores();
        }
        if let Some(rows) = self.rows {
            criteria.set_rows(rows);
        }
        if let Some(start) = self.start {
            criteria.set_start(start);
        }
        if let Some(sort) = &self.sort {
            criteria.set_order(sort.as_str());
        }
        for field in &self.facet_fields {
            criteria.add_facet_field(field.as_str());
        }
        criteria
    }
}

fn load_config(path: Option<&Path>) -> Result<LoadBalancerConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Ok(LoadBalancerConfig::from_json(&raw)?)
        }
        None => Ok(LoadBalancerConfig::from_env()?),
    }
}

fn document_json(document: &Document) -> Value {
    let mut out = document.fields().clone();
    if let Some(position) = document.position() {
        out.insert("_position".to_string(), json!(position));
    }
    if let Some(score) = document.score() {
        out.insert("_score".to_string(), json!(score));
    }
    Value::Object(out)
}

async fn search(backend: &Backend, args: &QueryArgs) -> Result<Value> {
    let response = backend.search::<Document>(&args.to_criteria()).await?;
    let results = response.results()?;

    let facets: Map<String, Value> = response
        .field_facets()
        .iter()
        .map(|(name, facet)| (name.clone(), Value::Object(facet.values().clone())))
        .collect();

    Ok(json!({
        "numFound": results.total(),
        "docs": results.iter().map(document_json).collect::<Vec<_>>(),
        "facets": facets,
    }))
}

fn read_documents(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read documents {}", path.display()))?;
    let documents = match serde_json::from_str::<Value>(&raw)? {
        Value::Object(document) => vec![document],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(document) => Ok(document),
                other => bail!("Expected a JSON object, got: {}", other),
            })
            .collect::<Result<Vec<_>>>()?,
        other => bail!("Expected a JSON object or array, got: {}", other),
    };
    Ok(documents)
}

async fn run(cli: Cli) -> Result<Value> {
    let config = load_config(cli.config.as_deref())?;
    let backend = LoadBalancer::from_http_config(config)?;

    match cli.command {
        Command::Search(args) => search(&backend, &args).await,
        Command::Count(args) => {
            let count = backend.count(&args.to_criteria()).await?;
            Ok(json!({ "count": count }))
        }
        Command::Index {
            file,
            commit_within,
            commit,
        } => {
            let documents = read_documents(&file)?;
            let batch = documents.iter().map(Indexable::Fields).collect();
            let indexed = backend
                .index(IndexRequest::Batch(batch), commit_within)
                .await?;
            let committed = commit && indexed && backend.commit().await?;
            Ok(json!({ "indexed": indexed, "count": documents.len(), "committed": committed }))
        }
        Command::Delete { ids, commit } => {
            let request = DeleteRequest::Batch(ids.into_iter().map(DeleteRequest::Id).collect());
            let deleted = backend.delete(request).await?;
            let committed = commit && deleted && backend.commit().await?;
            Ok(json!({ "deleted": deleted, "committed": committed }))
        }
        Command::Commit => Ok(json!({ "committed": backend.commit().await? })),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let output = run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
