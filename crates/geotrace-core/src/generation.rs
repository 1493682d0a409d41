//! Request generations for detecting stale asynchronous responses.
//!
//! Every request that can overlap with a newer one of the same kind is
//! stamped with a [`Generation`]. When its response arrives, the owner
//! checks [`GenerationCounter::is_current`] and drops anything older
//! than the most recently issued request.

/// An opaque request stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The raw counter value, e.g. for passing through a message channel.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Issues increasing generations and remembers the latest one.
#[derive(Debug, Default, Clone)]
pub struct GenerationCounter {
    latest: u64,
}

impl GenerationCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self { latest: 0 }
    }

    /// Issue a new generation, invalidating every earlier one.
    pub const fn issue(&mut self) -> Generation {
        self.latest += 1;
        Generation(self.latest)
    }

    /// Invalidate every outstanding generation without issuing a new
    /// request (e.g. the user cleared the state the request would fill).
    pub const fn invalidate(&mut self) {
        self.latest += 1;
    }

    /// Whether `generation` is the most recently issued one.
    #[must_use]
    pub const fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.latest
    }
}
