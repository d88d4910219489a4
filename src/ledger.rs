use std::collections::TryReserveError;

/// Room reserved for every new ledger when its connection is admitted.
pub const INITIAL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceEntry {
    pub timestamp: i32,
    pub price: i32,
}

/// The prices a single client has submitted, kept sorted by timestamp.
///
/// Entries sharing a timestamp are kept in the order they were inserted.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<PriceEntry>,
}

impl Ledger {
    /// Creates an empty ledger with room for [`INITIAL_CAPACITY`] entries,
    /// failing instead of aborting if that memory isn't available.
    pub fn with_initial_capacity() -> Result<Self, TryReserveError> {
        let mut entries = Vec::new();
        entries.try_reserve(INITIAL_CAPACITY)?;
        Ok(Self { entries })
    }

    // Places the entry after every entry with a timestamp <= its own.
    //
    // If the storage can't grow the ledger is left untouched and the error is
    // handed back, the caller decides whether it matters.
    pub fn insert(&mut self, timestamp: i32, price: i32) -> Result<(), TryReserveError> {
        self.entries.try_reserve(1)?;

        // most clients send prices in order, so walk back from the tail
        let mut idx = self.entries.len();
        while idx > 0 && self.entries[idx - 1].timestamp > timestamp {
            idx -= 1;
        }
        self.entries.insert(idx, PriceEntry { timestamp, price });

        Ok(())
    }

    // Returns the mean price over [min_time, max_time], truncated toward zero.
    // An empty or inverted range yields 0.
    pub fn average(&self, min_time: i32, max_time: i32) -> i32 {
        if min_time > max_time {
            return 0;
        }

        let start = self.entries.partition_point(|e| e.timestamp < min_time);
        let end = self.entries.partition_point(|e| e.timestamp <= max_time);
        let matched = &self.entries[start..end];
        if matched.is_empty() {
            return 0;
        }

        let sum: i64 = matched.iter().map(|e| e.price as i64).sum();
        // the mean of i32 values always fits back into an i32
        (sum / matched.len() as i64) as i32
    }

    pub fn entries(&self) -> &[PriceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
