//! Debounced tasks.
//!
//! A [`Debouncer`] runs only the last of a burst of calls, `delay` after
//! that call. It owns its pending task: a new call, [`Debouncer::cancel`] or
//! dropping the debouncer aborts it.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Default delay for keystroke-driven checks.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `task`, replacing whatever was pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Abort the pending task, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
