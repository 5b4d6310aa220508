use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("key {key:?} already exists for type {type_id}")]
    Duplicate { type_id: u16, key: String },
    #[error("id {id} belongs to shard {owner}, not this shard")]
    WrongShard { id: u64, owner: u16 },
    #[error(transparent)]
    Catalog(#[from] graph_catalog::Error),
    #[error(transparent)]
    Property(#[from] graph_property::Error),
    #[error(transparent)]
    Id(#[from] graph_id::Error),
}
