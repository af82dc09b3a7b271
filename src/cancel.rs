//! Cooperative cancellation for long-running hashes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag polled at slice boundaries (and between batch jobs).
///
/// Cloning yields another handle to the same flag, so one token can cancel
/// a whole batch. Cancellation is sticky; tokens are not reset.
///
/// ## Example
///
/// ```rust, ignore
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
/// // ... hand `worker_token` to `hash_password_with_token` on a thread ...
/// token.cancel();
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
