use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle shared between a caller and an in-flight
/// provider call. Cloning yields another handle to the same flag; once set
/// it stays set for the lifetime of the token.
///
/// Provider clients check the token between streamed chunks and stop
/// consuming once it is set, so cancellation takes effect without waiting
/// for the underlying request to complete.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
