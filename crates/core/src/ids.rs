//! Identity & timestamp generation for local-only entities.
//!
//! Local ids look like `local-{epochMillis}-{counter}`. Store-issued ids are
//! opaque UUIDs, so the prefix is enough to tell which branch produced an
//! entity.

use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Prefix carried by every locally generated id.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Session-scoped generator of local surrogate ids and ISO-8601 timestamps.
pub struct IdentityGenerator {
    counter: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            clock,
        }
    }

    /// Next local id. The counter makes ids unique even within one millisecond.
    pub fn next_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!(
            "{}{}-{}",
            LOCAL_ID_PREFIX,
            self.clock.now().timestamp_millis(),
            seq
        )
    }

    /// Current wall-clock time as an RFC 3339 string.
    pub fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Id and creation timestamp for a new local record.
    pub fn mint(&self) -> (String, String) {
        (self.next_id(), self.now())
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Restart the counter at `value`.
    pub fn seed(&self, value: u64) {
        self.counter.store(value, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.seed(0);
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdentityGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityGenerator")
            .field("issued", &self.issued())
            .finish()
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the same format the generator uses.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// True when `id` has the `local-{millis}-{counter}` shape.
pub fn is_local_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(LOCAL_ID_PREFIX) else {
        return false;
    };
    let Some((millis, seq)) = rest.split_once('-') else {
        return false;
    };
    let numeric = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    numeric(millis) && numeric(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn fixed_generator() -> IdentityGenerator {
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        IdentityGenerator::with_clock(Arc::new(FixedClock(instant)))
    }

    #[test]
    fn sequential_ids_are_distinct_and_local() {
        let generator = IdentityGenerator::new();
        let ids: Vec<String> = (0..500).map(|_| generator.next_id()).collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| is_local_id(id)));
    }

    #[test]
    fn frozen_clock_still_yields_unique_ids() {
        let generator = fixed_generator();
        assert_eq!(generator.next_id(), "local-1772357400000-1");
        assert_eq!(generator.next_id(), "local-1772357400000-2");
    }

    #[test]
    fn reset_restarts_the_counter() {
        let generator = fixed_generator();
        generator.next_id();
        generator.next_id();
        generator.reset();
        assert_eq!(generator.issued(), 0);
        assert_eq!(generator.next_id(), "local-1772357400000-1");
    }

    #[test]
    fn timestamps_are_iso_8601() {
        let generator = fixed_generator();
        assert_eq!(generator.now(), "2026-03-01T09:30:00.000Z");
    }

    #[test]
    fn store_ids_are_not_local() {
        assert!(!is_local_id("5b1c8a7e-0f43-4c1e-9d2b-7a0c3e9f1b22"));
        assert!(!is_local_id("local-"));
        assert!(!is_local_id("local-abc-1"));
        assert!(!is_local_id("new-1700000000000"));
        assert!(is_local_id("local-1700000000000-7"));
    }
}
