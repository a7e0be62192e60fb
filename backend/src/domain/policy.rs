use serde::{Deserialize, Serialize};

/// What to do when a sleep or daycare period ends at an earlier clock time
/// than it started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanPolicy {
    /// The period crossed midnight: the end is on the following day
    #[default]
    WrapMidnight,
    /// Refuse the entry with a validation error
    Reject,
}

/// How appends and removals write back to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Read, modify, overwrite. A concurrent writer's change can be lost.
    #[default]
    LastWriterWins,
    /// Compare the collection version before overwriting and retry the
    /// whole read-modify-write on mismatch
    OptimisticRetry { max_attempts: u32 },
}

/// Behaviour knobs of the activity log service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogPolicy {
    pub span_policy: SpanPolicy,
    pub concurrency: ConcurrencyPolicy,
    /// Report anything past 24 hours as "more than a day"
    pub collapse_after_day: bool,
}
