/// Rank of an executor process in the communicator (0-indexed).
pub type Rank = u32;

/// Matching tag for point-to-point transfers.
pub type Tag = u32;

/// Strategy used to redistribute partitions across executors.
///
/// `Sync` gathers every global partition to its owner through a
/// collective; `Async` walks a round-robin pairing schedule and exchanges
/// ranges pairwise, skipping pairs with nothing to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeMode {
    Sync,
    Async,
}

impl ExchangeMode {
    /// Human-readable name, matching the `exchange.type` property values.
    pub const fn name(self) -> &'static str {
        match self {
            ExchangeMode::Sync => "sync",
            ExchangeMode::Async => "async",
        }
    }
}

impl std::fmt::Display for ExchangeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
