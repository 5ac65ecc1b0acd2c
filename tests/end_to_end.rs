//! End-to-end: seed a node, connect through the facade, filter by xattr

use docmeta::{
    Cluster, ClusterOptions, DocValue, Error, Keyspace, Listing, Predicate, QueryEngine,
    QueryOptions, QueryRow, RowStream, StoreServer, WriteOptions,
};
use std::sync::Arc;

/// Lists every id of the hotel collection, in id order
struct HotelIds;

impl QueryEngine for HotelIds {
    fn execute(
        &self,
        _statement: &str,
        options: &QueryOptions,
        node: &StoreServer,
    ) -> docmeta::Result<RowStream> {
        let store = node.collection_store(&Keyspace::new("travel-sample", "inventory", "hotel"))?;
        let column = options.id_column.clone();
        Ok(Box::new(
            store
                .scan_ids("")
                .into_iter()
                .map(move |id| Ok(QueryRow::with_id(&column, id))),
        ))
    }
}

#[test]
fn jsmith_discount_filter() {
    let node = StoreServer::start("end-to-end.test").unwrap();
    node.add_user("Administrator", "password");
    node.create_bucket("travel-sample").unwrap();
    node.create_collection(&Keyspace::new("travel-sample", "inventory", "hotel"))
        .unwrap();
    node.set_query_engine(Arc::new(HotelIds));

    let cluster = Cluster::connect(
        "docmeta://end-to-end.test",
        ClusterOptions::new("Administrator", "password"),
    )
    .unwrap();
    let hotels = cluster
        .bucket("travel-sample")
        .unwrap()
        .scope("inventory")
        .collection("hotel")
        .unwrap();

    for (id, discount) in [("hotel_10138", 20), ("hotel_10142", 10)] {
        hotels
            .upsert(id, DocValue::from(serde_json::json!({"type": "hotel"})))
            .unwrap();
        hotels
            .write(id, "discounts.jsmith123", discount, &WriteOptions::xattr())
            .unwrap();
    }
    hotels
        .upsert("hotel_10155", DocValue::from(serde_json::json!({"type": "hotel"})))
        .unwrap();

    let results = hotels
        .filter(
            Listing::query(
                "SELECT META().id FROM `travel-sample`.inventory.hotel",
                cluster.query_options(),
            ),
            "discounts.jsmith123",
            Predicate::greater_than(15.0),
        )
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(results.ids(), vec!["hotel_10138"]);
    assert_eq!(results.stats.listed, 3);
    assert_eq!(results.stats.absent, 1);
    assert_eq!(node.active_sessions(), 1);

    cluster.disconnect();
    drop(hotels);
    assert_eq!(node.active_sessions(), 0);
}

#[test]
fn wrong_credentials_never_open_a_session() {
    let node = StoreServer::start("end-to-end-auth.test").unwrap();
    node.add_user("Administrator", "password");
    let err = Cluster::connect(
        "docmeta://end-to-end-auth.test",
        ClusterOptions::new("Administrator", "letmein"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert_eq!(node.active_sessions(), 0);
}
