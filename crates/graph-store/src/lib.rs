//! The single-shard CRUD surface: a [`NodeStore`] and a
//! [`RelationshipStore`], each pairing a [`graph_catalog::TypeCatalog`]
//! with a [`graph_property::PropertyCatalog`]. Everything here operates
//! on one shard's slice of the graph; cross-shard routing, adjacency
//! fan-out, and catalog replication live one layer up, in `graph-shard`.

mod error;
mod key_index;
mod node;
mod relationship;

pub use error::Error;
pub use node::{Node, NodeStore, RemovedNode};
pub use relationship::{Relationship, RelationshipStore};
