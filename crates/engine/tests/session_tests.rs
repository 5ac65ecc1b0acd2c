//! Connection and session lifecycle

mod common;

use common::*;
use docmeta_core::{DocValue, Error, Keyspace, PathNamespace};
use docmeta_engine::{ClientConfig, Cluster, ClusterOptions, QueryOptions, StoreServer};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn connect(node: &StoreServer, user: &str, password: &str) -> docmeta_core::Result<Cluster> {
    Cluster::connect(
        &format!("docmeta://{}", node.address()),
        ClusterOptions::new(user, password),
    )
}

#[test]
fn wrong_password_is_authentication_error() {
    let node = start_node("auth");
    let err = connect(&node, USER, "nope").unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert_eq!(node.active_sessions(), 0);

    let err = connect(&node, "nobody", PASSWORD).unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[test]
fn removed_user_cannot_connect() {
    let node = start_node("remove-user");
    node.add_user("jsmith123", "secret");
    let existing = connect(&node, "jsmith123", "secret").unwrap();

    assert!(node.remove_user("jsmith123"));
    assert!(!node.remove_user("jsmith123"));
    let err = connect(&node, "jsmith123", "secret").unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));

    assert!(existing.is_connected());
    assert!(existing.bucket(BUCKET).is_ok());
}

#[test]
fn session_released_when_last_handle_drops() {
    let node = start_node("release-drop");
    let cluster = connect(&node, USER, PASSWORD).unwrap();
    assert_eq!(node.active_sessions(), 1);

    let collection = cluster.bucket(BUCKET).unwrap().default_collection().unwrap();
    drop(cluster);
    assert_eq!(node.active_sessions(), 1);
    collection.upsert("hotel_1", DocValue::object()).unwrap();

    drop(collection);
    assert_eq!(node.active_sessions(), 0);
}

#[test]
fn disconnect_releases_session_once() {
    let node = start_node("release-disconnect");
    let cluster = connect(&node, USER, PASSWORD).unwrap();
    let collection = cluster.bucket(BUCKET).unwrap().default_collection().unwrap();
    assert!(cluster.is_connected());

    cluster.disconnect();
    assert_eq!(node.active_sessions(), 0);
    let err = collection.get("hotel_1").unwrap_err();
    assert!(matches!(err, Error::Unavailable { .. }));

    drop(collection);
    assert_eq!(node.active_sessions(), 0);
}

#[test]
fn session_released_on_error_path() {
    let node = start_node("release-error");
    {
        let cluster = connect(&node, USER, PASSWORD).unwrap();
        assert!(matches!(
            cluster.bucket("no-such-bucket"),
            Err(Error::KeyspaceNotFound(_))
        ));
    }
    assert_eq!(node.active_sessions(), 0);
}

#[test]
fn offline_node_fails_with_unavailable() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();

    tc.node.set_online(false);
    assert!(!tc.cluster.is_connected());
    assert!(matches!(
        coll.read("hotel_1", "name", PathNamespace::Body),
        Err(Error::Unavailable { .. })
    ));
    assert!(matches!(
        connect(&tc.node, USER, PASSWORD),
        Err(Error::Unavailable { .. })
    ));

    tc.node.set_online(true);
    assert!(coll.get("hotel_1").is_ok());
}

#[test]
fn connect_falls_through_to_next_host() {
    let node = start_node("fallback");
    let conn = format!("docmeta://fallback-missing.test,{}", node.address());
    let cluster = Cluster::connect(&conn, ClusterOptions::new(USER, PASSWORD)).unwrap();
    assert!(cluster.is_connected());
    assert_eq!(node.active_sessions(), 1);
}

#[test]
fn dropped_node_is_unreachable() {
    let node = start_node("dropped");
    let address = node.address().to_string();
    drop(node);

    let err = Cluster::connect(&address, ClusterOptions::new(USER, PASSWORD)).unwrap_err();
    assert!(matches!(err, Error::Unavailable { .. }));
}

#[test]
fn named_scope_and_collection() {
    let tc = TestCluster::new();
    let hotels = Keyspace::new(BUCKET, "inventory", "hotel");
    assert!(matches!(
        tc.cluster.bucket(BUCKET).unwrap().scope("inventory").collection("hotel"),
        Err(Error::KeyspaceNotFound(_))
    ));

    tc.node.create_collection(&hotels).unwrap();
    let coll = tc
        .cluster
        .bucket(BUCKET)
        .unwrap()
        .scope("inventory")
        .collection("hotel")
        .unwrap();
    assert_eq!(coll.keyspace(), &hotels);
    coll.upsert("hotel_1", DocValue::object()).unwrap();

    let default = tc.collection();
    assert!(matches!(
        default.get("hotel_1"),
        Err(Error::DocumentNotFound { .. })
    ));
    assert!(tc.cluster.collection(&hotels).unwrap().get("hotel_1").is_ok());
}

#[test]
fn cluster_query_forwards_to_engine() {
    let tc = TestCluster::new();
    assert!(matches!(
        tc.cluster.query("SELECT 1", &QueryOptions::new()),
        Err(Error::Query(_))
    ));

    tc.node.set_query_engine(Arc::new(PrefixScan));
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();
    coll.upsert("hotel_2", DocValue::object()).unwrap();

    let rows = tc
        .cluster
        .query("hotel_", &tc.cluster.query_options())
        .unwrap()
        .collect_rows()
        .unwrap();
    let ids: Vec<String> = rows.iter().map(|r| r.id("id").unwrap()).collect();
    assert_eq!(ids, vec!["hotel_1", "hotel_2"]);
}

#[test]
fn connect_with_config_file() {
    let node = start_node("config");
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(docmeta_engine::CONFIG_FILE_NAME);

    let mut config = ClientConfig::default();
    config.connection_string = format!("docmeta://{}?preserve_order=false", node.address());
    config.credentials.username = USER.to_string();
    config.credentials.password = PASSWORD.to_string();
    config.filter.workers = 2;
    config.write_to_file(&path).unwrap();

    let loaded = ClientConfig::from_file(&path).unwrap();
    let cluster = Cluster::connect_with_config(&loaded).unwrap();
    assert_eq!(cluster.filter_options().workers, 2);
    assert!(!cluster.filter_options().preserve_order);
}

#[test]
fn node_purges_expired_documents_in_every_collection() {
    let tc = TestCluster::new();
    let hotels = Keyspace::new(BUCKET, "inventory", "hotel");
    tc.node.create_collection(&hotels).unwrap();
    let default = tc.collection();
    let named = tc.cluster.collection(&hotels).unwrap();

    let short = Duration::from_millis(1);
    default.upsert_with_expiry("hotel_1", DocValue::object(), short).unwrap();
    named.upsert_with_expiry("hotel_2", DocValue::object(), short).unwrap();
    default
        .upsert_with_expiry("hotel_3", DocValue::object(), Duration::from_secs(3600))
        .unwrap();
    named.upsert("hotel_4", DocValue::object()).unwrap();
    thread::sleep(Duration::from_millis(20));

    assert_eq!(tc.node.purge_expired(), 2);
    assert_eq!(tc.node.purge_expired(), 0);
    assert_eq!(default.scan_ids("hotel_").unwrap(), vec!["hotel_3"]);
    assert_eq!(named.scan_ids("hotel_").unwrap(), vec!["hotel_4"]);
    default.insert("hotel_1", DocValue::object()).unwrap();
}

#[test]
fn sessions_have_distinct_ids() {
    let node = start_node("ids");
    let a = connect(&node, USER, PASSWORD).unwrap();
    let b = connect(&node, USER, PASSWORD).unwrap();
    assert_ne!(a.session_id(), b.session_id());
    assert_eq!(node.active_sessions(), 2);
}
