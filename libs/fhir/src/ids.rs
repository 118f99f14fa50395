//! Resource id injection.
//!
//! The projectors mint one id per emitted resource. Ids come from a caller
//! supplied source rather than a module-level RNG so two projections of the
//! same aggregate can be compared structurally in tests.

use uuid::Uuid;

/// Source of document-local resource ids.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Production source: random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic source for tests: `prefix-1`, `prefix-2`, ...
#[derive(Debug)]
pub struct SequenceSource {
    prefix: String,
    counter: u64,
}

impl SequenceSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl IdSource for SequenceSource {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.prefix, self.counter)
    }
}

/// Document-local reference to a resource id.
pub(crate) fn urn(id: &str) -> String {
    format!("urn:uuid:{id}")
}
