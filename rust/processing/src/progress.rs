// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress reporting and cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coarse progress of one configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate<'a> {
    pub configuration: &'a str,
    /// Position of the configuration in the run (0-based)
    pub index: usize,
    pub count: usize,
    pub completed: usize,
    pub total: usize,
}

impl ProgressUpdate<'_> {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate<'_>);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressUpdate<'_>) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate<'_>) {
        self(update)
    }
}

/// Sink that drops every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _update: &ProgressUpdate<'_>) {}
}

/// Shared flag checked between configurations and between target batches
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |u: &ProgressUpdate<'_>| seen.lock().unwrap().push(u.percent());
        sink.on_progress(&ProgressUpdate {
            configuration: "a",
            index: 0,
            count: 1,
            completed: 5,
            total: 20,
        });
        assert_eq!(*seen.lock().unwrap(), vec![25.0]);
    }
}
