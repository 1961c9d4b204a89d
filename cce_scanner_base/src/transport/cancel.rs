//! Cancellation of in-flight fetches
//!
//! A transport registers an abort hook (typically a socket shutdown) while a
//! connection is open. `cancel` sets the flag and fires the hook so blocked
//! I/O returns promptly.

use super::errors::{FetchError, FetchStage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type AbortHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    abort: Mutex<Option<AbortHook>>,
}

#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        let hook = self.hook_slot().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Install `hook`; runs it at once if the token is already cancelled
    pub fn register_abort<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_cancelled() {
            hook();
            return;
        }
        *self.hook_slot() = Some(Box::new(hook));
        // cancel() may have run between the check and the store
        if self.is_cancelled() {
            let hook = self.hook_slot().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    pub fn clear_abort(&self) {
        self.hook_slot().take();
    }

    pub fn check(&self, stage: FetchStage) -> Result<(), FetchError> {
        if self.is_cancelled() {
            return Err(FetchError::Cancelled { stage });
        }
        Ok(())
    }

    fn hook_slot(&self) -> MutexGuard<'_, Option<AbortHook>> {
        self.state
            .abort
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancel_fires_hook_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let token = CancelToken::new();
        let counter = fired.clone();
        token.register_abort(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(token.check(FetchStage::Transfer).is_err());
    }

    #[test]
    fn test_hook_registered_after_cancel_runs_immediately() {
        let token = CancelToken::new();
        token.cancel();

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        token.register_abort(move || flag.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cleared_hook_does_not_fire() {
        let fired = Arc::new(AtomicBool::new(false));
        let token = CancelToken::new();
        let flag = fired.clone();
        token.register_abort(move || flag.store(true, Ordering::SeqCst));
        token.clear_abort();

        token.cancel();
        assert!(!fired.load(Ordering::SeqCst));
        assert!(token.clone().is_cancelled());
    }
}
