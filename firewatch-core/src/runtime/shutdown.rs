//! Shutdown signalling between the caller of a runtime and its threads
use std::sync::Arc;

use tokio::sync::watch;

/// How a running job should stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Stop ingesting, process everything already queued and fire all pending windows
    Graceful,
    /// Stop as soon as possible. Pending windows are discarded
    Abort,
}

/// Receiving end of a shutdown request, checked by every runtime thread
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<Option<ShutdownMode>>);

impl ShutdownSignal {
    /// The requested shutdown, if any
    pub fn requested(&self) -> Option<ShutdownMode> {
        *self.0.borrow()
    }

    /// A signal which never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self(rx)
    }
}

/// Handle to request the shutdown of a running job from any thread
#[derive(Debug, Clone)]
pub struct RuntimeHandle(Arc<watch::Sender<Option<ShutdownMode>>>);

impl Default for RuntimeHandle {
    fn default() -> Self {
        Self(Arc::new(watch::Sender::new(None)))
    }
}

impl RuntimeHandle {
    /// Request a shutdown of the job.
    /// An abort overrides an earlier graceful request, but not the other way around.
    pub fn shutdown(&self, mode: ShutdownMode) {
        self.0.send_if_modified(|current| match *current {
            Some(ShutdownMode::Abort) => false,
            Some(prev) if prev == mode => false,
            _ => {
                *current = Some(mode);
                true
            }
        });
    }

    /// Subscribe to shutdown requests
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_sees_request() {
        let handle = RuntimeHandle::default();
        let signal = handle.signal();
        assert_eq!(signal.requested(), None);
        handle.clone().shutdown(ShutdownMode::Graceful);
        assert_eq!(signal.requested(), Some(ShutdownMode::Graceful));
    }

    #[test]
    fn abort_is_final() {
        let handle = RuntimeHandle::default();
        let signal = handle.signal();
        handle.shutdown(ShutdownMode::Abort);
        handle.shutdown(ShutdownMode::Graceful);
        assert_eq!(signal.requested(), Some(ShutdownMode::Abort));
    }

    #[test]
    fn never_stays_quiet() {
        assert_eq!(ShutdownSignal::never().requested(), None);
    }
}
