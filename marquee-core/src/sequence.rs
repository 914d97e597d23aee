use std::sync::atomic::{AtomicU64, Ordering};

/// Produces externally presentable booking numbers. A monotonic sequence
/// keeps concurrent generations apart, the random suffix keeps numbers from
/// being guessable; the store's unique constraint remains the final word,
/// and the coordinator regenerates on a reported duplicate.
pub struct BookingNumberGenerator {
    prefix: String,
    sequence: AtomicU64,
}

impl BookingNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let suffix: u16 = rand::random();
        format!("{}-{:06}-{:04X}", self.prefix, seq, suffix)
    }
}
