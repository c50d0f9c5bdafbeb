//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Predicate polled between statements and while a subprocess runs.
pub type CancelCheck = Box<dyn Fn() -> bool + Send + Sync>;

/// A shareable cancel switch. Clone it into the thread that decides to
/// cancel, and hand [`CancelFlag::check`] to [`Runtime::set_cancel_check`].
///
/// [`Runtime::set_cancel_check`]: crate::runtime::Runtime::set_cancel_check
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// A predicate reading this flag.
    pub fn check(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let flag = Arc::clone(&self.0);
        move || flag.load(Ordering::SeqCst)
    }
}
