//! Cooperative cancellation shared by every component of one query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event, Event};

/// Cancellation flag checked at the start of every drain step.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with a cancellation error once cancellation has been requested
    pub fn check(&self) -> QueryResult<()> {
        if self.is_cancelled() {
            log_event(Event::DrainCancelled);
            return Err(QueryError::cancelled());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().unwrap_err().is_cancelled());
    }
}
