//! Golden vectors for address and hash-chain derivation.
//!
//! The expected values were computed independently of this crate, with a
//! plain SHA-256 over the documented byte layouts. Any change to them is a
//! format break: every existing ledger would resolve to different accounts.

use serde::{Deserialize, Serialize};

/// A derivation with a fixed expected digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Expected digest (hex-encoded).
    pub expected_hex: String,
}

/// Owner used by every vector: 32 bytes of `0x01`.
pub const VECTOR_OWNER: [u8; 32] = [0x01; 32];

/// Payloads appended to `orders` in the chain vectors.
pub const VECTOR_PAYLOADS: [&str; 2] = [r#"{"id":"1","item":"pen"}"#, r#"{"id":"2","item":"ink"}"#];

fn vector(id: &str, description: &str, expected_hex: &str) -> DerivationVector {
    DerivationVector {
        id: id.into(),
        description: description.into(),
        expected_hex: expected_hex.into(),
    }
}

/// Address vectors.
pub fn address_vectors() -> Vec<DerivationVector> {
    vec![
        vector(
            "root",
            "root address of VECTOR_OWNER",
            "a325b2e9ca4de5bbf6dd9f3cf8d4496ad881ae70d86de6d020b4f47951c18f47",
        ),
        vector(
            "table_orders",
            "address of table orders",
            "e2f7f02830f7323be3f6ed29c885fa2ba0264f498080f8c5bff3d287c6b12cd1",
        ),
        vector(
            "ext_orders_42_lines",
            "address of extension table orders/42/lines",
            "e55a7e816ec5e39288c64660103b28cb730b57827d5c9dc1bf86d888632a7a9a",
        ),
        vector(
            "domain_orders",
            "chain domain of table orders",
            "5bb92082b5e2cf4ec13339bcc447b40962fb5075370e7dc4ecc255a5f3febe29",
        ),
    ]
}

/// Chain vectors: the link after each of [`VECTOR_PAYLOADS`].
pub fn chain_vectors() -> Vec<DerivationVector> {
    vec![
        vector(
            "orders_link_0",
            "link after the first payload",
            "3dd22349bdfc5166aa4ae534d9f317fb265ab9a6839eb543eb5e14217660777d",
        ),
        vector(
            "orders_link_1",
            "link after the second payload",
            "f5685906cda194327b27b0c5e267e7b1ee150eb22c408b84fc9c6d7077a7715a",
        ),
    ]
}
