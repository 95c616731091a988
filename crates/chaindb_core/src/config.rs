//! Engine configuration.

/// Default ceiling for one canonical row payload, in bytes.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 900;

/// Default per-transaction byte ceiling for ledgers the engine creates.
pub const DEFAULT_MAX_TRANSACTION_SIZE: usize = 1232;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Largest canonical row payload accepted by `write_row`.
    pub max_payload_size: usize,

    /// Per-transaction ceiling enforced by ledgers opened through the engine.
    pub max_transaction_size: usize,

    /// Whether the file ledger syncs every frame before acknowledging it.
    pub sync_on_commit: bool,

    /// Whether to create the ledger directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            max_transaction_size: DEFAULT_MAX_TRANSACTION_SIZE,
            sync_on_commit: true,
            create_if_missing: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row payload ceiling.
    #[must_use]
    pub const fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Sets the transaction ceiling for ledgers opened with this config.
    #[must_use]
    pub const fn max_transaction_size(mut self, size: usize) -> Self {
        self.max_transaction_size = size;
        self
    }

    /// Sets whether to sync every committed frame.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether to create the ledger directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}
