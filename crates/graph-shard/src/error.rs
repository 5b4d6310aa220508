use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("type {name:?} is not registered")]
    UnknownType { name: String },
    #[error("id {id} does not resolve to a live node")]
    UnknownNode { id: u64 },
    #[error("shard actor is no longer running")]
    ShardGone,
    #[error(transparent)]
    Store(#[from] graph_store::Error),
}
