use std::time::Duration;

/// High-level classification of a failed request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Access-control or caller error; never retried.
    Fatal,
    /// Expired credential; retried after a refresh unless the operation
    /// requires pre-authenticated access.
    Credential,
    /// Connection or read I/O failure; propagated from the base runner and
    /// retried across calls by the stream layer instead.
    Transport,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded refresh-and-retry policy with capped exponential backoff.
///
/// The protocol's reference client looped without a ceiling and relied on
/// classification alone to terminate; attempts are bounded here so a
/// persistently expired credential fails with a distinct error instead of
/// spinning.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Compute the decision for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Only `Credential` failures
    /// are retried here.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Fatal | ErrorKind::Transport => RetryDecision::NoRetry,
            ErrorKind::Credential => {
                // Exponential backoff: base * 2^(attempt-1), capped.
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                let raw = self.base_delay.saturating_mul(exp);
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
        }
    }
}
