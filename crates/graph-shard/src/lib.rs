//! Cross-shard orchestration: one actor thread per shard, a boxed-job
//! mailbox for reaching into a shard's state, and a [`Cluster`] that
//! routes each cluster-level operation to the shard(s) that own it.
//!
//! Nothing in this crate ever locks another shard's state. The only
//! cross-shard primitive is [`shard::ShardHandle::invoke`]: hand a
//! closure to the shard that owns the data, and await its result.

mod error;
mod router;
mod shard;

pub use error::Error;
pub use router::Cluster;
pub use shard::{ShardHandle, ShardState, ShardThread};

#[cfg(test)]
mod tests {
    use super::*;
    use graph_property::{PropertyKind, TypedValue};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn create_type_replicates_to_every_shard() {
        let cluster = Cluster::spawn(4);
        let type_id = cluster.create_node_type("Person").await.unwrap();

        for shard in 0..cluster.shard_count() {
            let found = cluster
                .get_node(graph_id::pack(type_id as u32, 0, shard).unwrap())
                .await
                .unwrap();
            assert_eq!(found, None, "no nodes exist yet, but the type must resolve on every shard");
        }
        cluster.shutdown();
    }

    #[tokio::test]
    async fn add_get_remove_node_round_trip() {
        let cluster = Cluster::spawn(4);
        cluster.create_node_type("Person").await.unwrap();
        cluster.node_schema_add("Person", "age", PropertyKind::I64).await.unwrap();

        let id = cluster
            .add_node("Person", "alice", r#"{"age": 30}"#)
            .await
            .unwrap();
        assert_ne!(id, 0);

        let node = cluster.get_node(id).await.unwrap().unwrap();
        assert_eq!(node.key, "alice");
        assert_eq!(node.properties.get("age"), Some(&TypedValue::I64(30)));

        assert_eq!(cluster.find_node("Person", "alice").await.unwrap(), Some(id));

        let removed = cluster.remove_node(id).await.unwrap().unwrap();
        assert_eq!(removed.key, "alice");
        assert_eq!(cluster.get_node(id).await.unwrap(), None);
        assert_eq!(cluster.find_node("Person", "alice").await.unwrap(), None);

        cluster.shutdown();
    }

    #[tokio::test]
    async fn relationship_updates_adjacency_on_both_endpoints_even_across_shards() {
        let cluster = Cluster::spawn(8);
        cluster.create_node_type("Person").await.unwrap();
        cluster.create_relationship_type("KNOWS").await.unwrap();

        let alice = cluster.add_node("Person", "alice", "{}").await.unwrap();
        let bob = cluster.add_node("Person", "bob", "{}").await.unwrap();

        let rel = cluster
            .add_relationship("KNOWS", alice, bob, "{}")
            .await
            .unwrap();
        assert_ne!(rel, 0);

        assert_eq!(cluster.outgoing(alice).await.unwrap(), vec![rel]);
        assert_eq!(cluster.incoming(bob).await.unwrap(), vec![rel]);

        assert!(cluster.remove_relationship(rel).await.unwrap());
        assert_eq!(cluster.outgoing(alice).await.unwrap(), Vec::<u64>::new());
        assert_eq!(cluster.incoming(bob).await.unwrap(), Vec::<u64>::new());

        cluster.shutdown();
    }

    #[tokio::test]
    async fn removing_a_node_cascades_to_its_relationships() {
        let cluster = Cluster::spawn(4);
        cluster.create_node_type("Person").await.unwrap();
        cluster.create_relationship_type("KNOWS").await.unwrap();

        let alice = cluster.add_node("Person", "alice", "{}").await.unwrap();
        let bob = cluster.add_node("Person", "bob", "{}").await.unwrap();
        let rel = cluster
            .add_relationship("KNOWS", alice, bob, "{}")
            .await
            .unwrap();

        cluster.remove_node(alice).await.unwrap();

        assert_eq!(cluster.get_relationship(rel).await.unwrap(), None);
        assert_eq!(cluster.incoming(bob).await.unwrap(), Vec::<u64>::new());

        cluster.shutdown();
    }

    #[tokio::test]
    async fn unknown_type_name_is_an_error_not_a_panic() {
        let cluster = Cluster::spawn(2);
        let err = cluster.add_node("Ghost", "x", "{}").await.unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
        cluster.shutdown();
    }

    #[tokio::test]
    async fn add_relationship_rejects_a_dead_or_unknown_endpoint() {
        let cluster = Cluster::spawn(8);
        cluster.create_node_type("Person").await.unwrap();
        cluster.create_relationship_type("KNOWS").await.unwrap();

        let alice = cluster.add_node("Person", "alice", "{}").await.unwrap();
        let bob = cluster.add_node("Person", "bob", "{}").await.unwrap();

        let ghost = graph_id::pack(graph_id::type_of(bob), 999, graph_id::shard_of(bob)).unwrap();
        let err = cluster
            .add_relationship("KNOWS", alice, ghost, "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownNode { id } if id == ghost));

        cluster.remove_node(bob).await.unwrap();
        let err = cluster
            .add_relationship("KNOWS", alice, bob, "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownNode { id } if id == bob));

        assert_eq!(cluster.outgoing(alice).await.unwrap(), Vec::<u64>::new());
        cluster.shutdown();
    }

    #[tokio::test]
    async fn node_and_relationship_property_delete_routing() {
        let cluster = Cluster::spawn(4);
        cluster.create_node_type("Person").await.unwrap();
        cluster.create_relationship_type("KNOWS").await.unwrap();
        cluster.node_schema_add("Person", "age", PropertyKind::I64).await.unwrap();
        cluster
            .relationship_schema_add("KNOWS", "since", PropertyKind::I64)
            .await
            .unwrap();

        let alice = cluster.add_node("Person", "alice", r#"{"age": 30}"#).await.unwrap();
        let bob = cluster.add_node("Person", "bob", "{}").await.unwrap();
        let rel = cluster
            .add_relationship("KNOWS", alice, bob, r#"{"since": 2020}"#)
            .await
            .unwrap();

        assert!(cluster.delete_node_property(alice, "age").await.unwrap());
        assert_eq!(
            cluster.get_node_property(alice, "age").await.unwrap(),
            Some(TypedValue::I64(i64::MIN))
        );
        assert!(!cluster.delete_node_property(alice, "not_there").await.unwrap());

        assert!(cluster.delete_relationship_property(rel, "since").await.unwrap());
        assert_eq!(
            cluster.get_relationship_property(rel, "since").await.unwrap(),
            Some(TypedValue::I64(i64::MIN))
        );

        assert!(cluster.delete_all_node_properties(alice).await.unwrap());
        assert!(cluster.delete_all_relationship_properties(rel).await.unwrap());
        assert!(!cluster.delete_all_node_properties(0).await.unwrap());

        cluster.shutdown();
    }
}
