/// Classification for retry policy.
///
/// Used by the retry controller to decide how to respond to a failed attempt.
///
/// # Behavior Summary
///
/// | Class | Retry? | Consequence |
/// |-------|--------|-------------|
/// | `Fatal` | No | Propagated unchanged; the process boundary must exit non-zero |
/// | `Transient` | Yes, with linear backoff | `MaxRetriesExceeded` once the attempt budget runs out |
/// | `Never` | No | Propagated unchanged; the request was invalid or already exhausted |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry and never continue - the provider's credential could not
    /// be obtained, so every subsequent request is doomed too.
    ///
    /// A provider-wide credential outage cannot be worked around by retrying
    /// an individual request. Callers propagate this to the process boundary
    /// and terminate with a non-zero status.
    Fatal,

    /// Retry with linear backoff.
    ///
    /// Used for timeouts, connection failures, non-200 statuses, and
    /// unparseable response bodies. The next attempt may well succeed.
    Transient,

    /// Never retry - the failure is terminal for this request only.
    ///
    /// Used for invalid caller input (bad symbol, inverted date range),
    /// configuration problems, and an already-exhausted retry budget.
    Never,
}
