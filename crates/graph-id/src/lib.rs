//! Packing, unpacking, and stable routing for the graph store's 64-bit
//! external ids.
//!
//! An id is the concatenation, least-significant bits first, of `shard`
//! (10 bits), `type` (16 bits), and `slot` (38 bits). Every routed
//! operation derives its target shard and storage location from the id
//! alone: there is no side directory to consult.

use thiserror::Error;

pub const SHARD_BITS: u32 = 10;
pub const TYPE_BITS: u32 = 16;
pub const SLOT_BITS: u32 = 38;

pub const MAX_SHARD: u16 = (1u32 << SHARD_BITS) as u16 - 1;
pub const MAX_TYPE: u32 = (1u32 << TYPE_BITS) - 1;
pub const MAX_SLOT: u64 = (1u64 << SLOT_BITS) - 1;

const SHARD_MASK: u64 = (1u64 << SHARD_BITS) - 1;
const TYPE_MASK: u64 = (1u64 << TYPE_BITS) - 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("{field} value {value} overflows its {bits}-bit field")]
    Overflow {
        field: &'static str,
        bits: u32,
        value: u64,
    },
}

/// Packs a (type, slot, shard) triple into a 64-bit external id.
pub fn pack(type_id: u32, slot: u64, shard: u16) -> Result<u64, Error> {
    if shard > MAX_SHARD {
        return Err(Error::Overflow {
            field: "shard",
            bits: SHARD_BITS,
            value: shard as u64,
        });
    }
    if type_id > MAX_TYPE {
        return Err(Error::Overflow {
            field: "type",
            bits: TYPE_BITS,
            value: type_id as u64,
        });
    }
    if slot > MAX_SLOT {
        return Err(Error::Overflow {
            field: "slot",
            bits: SLOT_BITS,
            value: slot,
        });
    }
    Ok((slot << (SHARD_BITS + TYPE_BITS)) | ((type_id as u64) << SHARD_BITS) | (shard as u64))
}

/// Unpacks an external id into its (shard, type, slot) triple. Never fails:
/// every `u64` is a valid, if not necessarily live, id.
pub fn unpack(id: u64) -> (u16, u32, u64) {
    (shard_of(id), type_of(id), slot_of(id))
}

#[inline]
pub fn shard_of(id: u64) -> u16 {
    (id & SHARD_MASK) as u16
}

#[inline]
pub fn type_of(id: u64) -> u32 {
    ((id >> SHARD_BITS) & TYPE_MASK) as u32
}

#[inline]
pub fn slot_of(id: u64) -> u64 {
    id >> (SHARD_BITS + TYPE_BITS)
}

/// Routes a (type_name, key) pair to a shard in `0..shard_count`, via a
/// stable 64-bit hash mapped by the high half of a 128-bit multiply. This
/// avoids the bias a plain `hash % shard_count` would introduce, and
/// (unlike modulo) stays uniform as `shard_count` changes across process
/// restarts with a different core count.
pub fn route(type_name: &str, key: &str, shard_count: u16) -> u16 {
    let hash = hash_route_key(type_name, key);
    (((hash as u128) * (shard_count as u128)) >> 64) as u16
}

fn hash_route_key(type_name: &str, key: &str) -> u64 {
    use xxhash_rust::xxh3::Xxh3;
    use std::hash::Hasher;

    let mut hasher = Xxh3::new();
    hasher.write(type_name.as_bytes());
    hasher.write(b"-");
    hasher.write(key.as_bytes());
    hasher.finish()
}
