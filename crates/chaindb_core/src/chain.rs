//! Rolling hash chain over a table's row log.
//!
//! Each table has its own domain tag (see [`crate::address::chain_domain`]).
//! The chain starts at the domain itself and every accepted row payload
//! advances it by one link:
//!
//! ```text
//! H_0 = domain
//! H_n = SHA-256(domain | H_{n-1} | payload_n)
//! ```
//!
//! Folding the domain into every step keeps identical payload sequences in
//! different tables on different chains.

use crate::types::{HashLink, LogPosition};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Computes the link that follows `previous` once `payload` is appended.
#[must_use]
pub fn extend(domain: &HashLink, previous: &HashLink, payload: &[u8]) -> HashLink {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(previous.as_bytes());
    hasher.update(payload);
    HashLink::from_bytes(hasher.finalize().into())
}

/// Replays `payloads` from the genesis link and returns the final link.
///
/// An empty sequence yields the domain itself.
pub fn replay<I, P>(domain: &HashLink, payloads: I) -> HashLink
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    payloads
        .into_iter()
        .fold(*domain, |link, payload| extend(domain, &link, payload.as_ref()))
}

/// Returns whether replaying `payloads` ends at `claimed`.
pub fn verify<I, P>(domain: &HashLink, payloads: I, claimed: &HashLink) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    replay(domain, payloads) == *claimed
}

/// Outcome of re-checking a stored table log against its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Number of row records inspected.
    pub length: u64,
    /// Link stored with the last record, or the domain for an empty log.
    pub stored_head: HashLink,
    /// Link obtained by replaying every stored payload.
    pub computed_head: HashLink,
    /// First record whose stored link disagrees with the replay.
    pub first_divergence: Option<LogPosition>,
}

impl ChainReport {
    /// Whether every stored link matches the replay.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.first_divergence.is_none() && self.stored_head == self.computed_head
    }
}

/// Walks `(payload, stored_link)` pairs in log order and reports where the
/// stored links stop matching the replay.
pub fn audit<'a, I>(domain: &HashLink, records: I) -> ChainReport
where
    I: IntoIterator<Item = (&'a [u8], HashLink)>,
{
    let mut computed = *domain;
    let mut stored_head = *domain;
    let mut first_divergence = None;
    let mut length = 0u64;

    for (payload, stored) in records {
        computed = extend(domain, &computed, payload);
        if first_divergence.is_none() && stored != computed {
            first_divergence = Some(LogPosition::new(length));
        }
        stored_head = stored;
        length += 1;
    }

    ChainReport {
        length,
        stored_head,
        computed_head: computed,
        first_divergence,
    }
}
