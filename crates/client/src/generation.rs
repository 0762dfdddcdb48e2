//! Request-generation tokens.
//!
//! Each request takes a token from [`RequestGeneration::next`]; its response
//! is applied only while the token is still current. A later request, or an
//! explicit [`RequestGeneration::invalidate`], makes older responses stale.

/// Token identifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Monotonic generation counter.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration {
    current: u64,
}

impl RequestGeneration {
    #[must_use]
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Start a new request; every earlier token becomes stale.
    pub const fn next(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    /// Whether a response carrying `generation` may still be applied.
    #[must_use]
    pub const fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.current
    }

    /// Make every outstanding token stale without starting a request.
    pub const fn invalidate(&mut self) {
        self.current += 1;
    }
}
