/// Classification for retry policy.
///
/// Used by the provider's backoff loop to decide whether a failed request
/// is worth repeating.
///
/// # Behavior Summary
///
/// | Class | Retry? | Examples |
/// |-------|--------|----------|
/// | `Never` | No | 400, 403, malformed payload |
/// | `WithBackoff` | Yes, after an exponential delay | 429, 5xx, timeout, connection reset |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the request or the response is fundamentally invalid
    /// and repeating it would produce the same result.
    Never,

    /// Transient failure: rate limiting, server-side errors, or network
    /// problems. Retry after waiting, up to the policy's attempt budget.
    WithBackoff,
}
