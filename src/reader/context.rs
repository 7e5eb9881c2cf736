use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::transport::TransportError;

/// Deadline and cancellation shared by every stream of a read.
///
/// Checked when a stream is opened and before each network receive, never
/// inside the per-frame decode loop.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Why the context is done, if it is.
    pub fn err(&self) -> Option<TransportError> {
        if self.is_cancelled() {
            return Some(TransportError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(TransportError::DeadlineExceeded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_to_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();
        assert_eq!(clone.err(), None);
        ctx.cancel();
        assert_eq!(clone.err(), Some(TransportError::Cancelled));
    }

    #[test]
    fn past_deadline_is_exceeded() {
        let ctx = Context::with_deadline(Instant::now());
        assert_eq!(ctx.err(), Some(TransportError::DeadlineExceeded));
        assert_eq!(Context::with_timeout(Duration::from_secs(3600)).err(), None);
    }
}
