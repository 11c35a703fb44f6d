// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

mod common;

use common::{MemorySolr, Update};
use lala_solr::models::config::{ClientOptions, ConnectionConfig, LoadBalancerConfig};
use lala_solr::models::criteria::Criteria;
use lala_solr::models::document::Document;
use lala_solr::services::connection::{DeleteRequest, IndexRequest, SolrConnection};
use lala_solr::services::load_balancer::LoadBalancer;

fn document(id: &str) -> Document {
    Document::new().with_field("id", id)
}

#[tokio::test]
async fn test_writes_go_to_write_connection() {
    let reader = MemorySolr::new();
    let writer = MemorySolr::new();
    let balancer = LoadBalancer::new(reader.connection(), Some(writer.connection()));

    balancer
        .index(IndexRequest::Single(&document("1")), None)
        .await
        .unwrap();
    balancer.delete(DeleteRequest::Id("2".into())).await.unwrap();
    balancer.commit().await.unwrap();

    assert_eq!(writer.updates().len(), 3);
    assert!(reader.updates().is_empty());
}

#[tokio::test]
async fn test_reads_go_to_read_connection() {
    let reader = MemorySolr::new();
    let writer = MemorySolr::new();
    let balancer = LoadBalancer::new(reader.connection(), Some(writer.connection()));

    balancer.search::<Document>(&Criteria::new()).await.unwrap();
    balancer.count(&Criteria::new()).await.unwrap();

    assert_eq!(reader.queries().len(), 2);
    assert!(writer.queries().is_empty());
    assert!(balancer.last_query_response().is_some());
    assert!(balancer.write_connection().last_query_response().is_none());
}

#[tokio::test]
async fn test_without_write_connection_everything_goes_to_read() {
    let reader = MemorySolr::new();
    let balancer = LoadBalancer::new(reader.connection(), None);

    balancer
        .index(IndexRequest::Single(&document("1")), None)
        .await
        .unwrap();
    balancer.commit().await.unwrap();
    let count = balancer.count(&Criteria::new()).await.unwrap();

    assert_eq!(count, 1);
    assert_eq!(
        reader.updates(),
        vec![
            Update::Add {
                count: 1,
                commit_within: 0
            },
            Update::Commit
        ]
    );
}

#[tokio::test]
async fn test_reset_client_resets_both_connections() {
    let reader = MemorySolr::new();
    let writer = MemorySolr::new();
    let balancer = LoadBalancer::new(reader.connection(), Some(writer.connection()));

    balancer.commit().await.unwrap();
    balancer.reset_client();
    balancer.commit().await.unwrap();

    assert_eq!(writer.handles_created(), 2);
}

#[test]
fn test_from_config_builds_split_connections() {
    let solr = MemorySolr::new();
    let config = LoadBalancerConfig {
        read_connection: Some(ConnectionConfig::new(ClientOptions::new(
            "replica", 8983, "/solr",
        ))),
        write_connection: Some(ConnectionConfig::new(ClientOptions::new(
            "primary", 8983, "/solr",
        ))),
    };

    let balancer = LoadBalancer::from_config(config, solr.factory()).unwrap();
    assert_eq!(balancer.read_connection().client_options().hostname, "replica");
    assert_eq!(balancer.write_connection().client_options().hostname, "primary");
}
