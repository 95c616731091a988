//! Deterministic address derivation.
//!
//! Every account the engine touches lives at an address computed from
//! human-readable names and the owner identity:
//!
//! ```text
//! root       = SHA-256("chaindb/root/v1"  | lp(owner))
//! table      = SHA-256("chaindb/table/v1" | lp(owner) | lp(name))
//! extension  = SHA-256("chaindb/ext/v1"   | lp(owner) | lp(base) | lp(row_id) | lp(key))
//! domain     = SHA-256("chaindb/chain/v1" | lp(table address))
//! ```
//!
//! `lp(x)` is `x` prefixed with its length as a little-endian `u32`, so no
//! two seed lists share an encoding. No tag is a prefix of another.

use crate::types::{Address, HashLink, Owner};
use sha2::{Digest, Sha256};

const ROOT_TAG: &[u8] = b"chaindb/root/v1";
const TABLE_TAG: &[u8] = b"chaindb/table/v1";
const EXTENSION_TAG: &[u8] = b"chaindb/ext/v1";
const CHAIN_TAG: &[u8] = b"chaindb/chain/v1";

fn derive(tag: &[u8], seeds: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for seed in seeds {
        #[allow(clippy::cast_possible_truncation)]
        hasher.update((seed.len() as u32).to_le_bytes());
        hasher.update(seed);
    }
    hasher.finalize().into()
}

/// Address of the owner's root directory.
#[must_use]
pub fn root_address(owner: &Owner) -> Address {
    Address::from_bytes(derive(ROOT_TAG, &[owner.as_bytes()]))
}

/// Address of the owner's table `name`.
#[must_use]
pub fn table_address(owner: &Owner, name: &str) -> Address {
    Address::from_bytes(derive(TABLE_TAG, &[owner.as_bytes(), name.as_bytes()]))
}

/// Address of the extension table hung off row `row_id` of `base` under `key`.
#[must_use]
pub fn extension_address(owner: &Owner, base: &str, row_id: &str, key: &str) -> Address {
    Address::from_bytes(derive(
        EXTENSION_TAG,
        &[
            owner.as_bytes(),
            base.as_bytes(),
            row_id.as_bytes(),
            key.as_bytes(),
        ],
    ))
}

/// Hash-chain domain tag of the table stored at `table`.
#[must_use]
pub fn chain_domain(table: &Address) -> HashLink {
    HashLink::from_bytes(derive(CHAIN_TAG, &[table.as_bytes()]))
}
