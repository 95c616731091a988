//! Shared helpers for the ChainDB benchmarks.

pub mod utils;
