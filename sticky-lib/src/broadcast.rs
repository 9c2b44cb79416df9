//! "The collection changed" signalling between windows.
//!
//! Signals carry no payload besides the id of the window that sent them. A window never reacts
//! to its own signal, and any number of pending signals collapse into a single reload.

use std::{
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
};

use derive_more::Display;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, trace};

const DEFAULT_CAPACITY: usize = 64;

/// Identifies one open window for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("window-{_0}")]
pub struct WindowId(u64);

impl WindowId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub trait Broadcaster: Send + Sync + Debug {
    /// Tell every other live window that the store changed. Fire-and-forget.
    fn notify_changed(&self, origin: WindowId);
}

/// In-process [`Broadcaster`] over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct LocalBroadcaster {
    sender: broadcast::Sender<WindowId>,
}

impl LocalBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Start listening on behalf of `window`. Signals sent before this call are not seen.
    pub fn subscribe(&self, window: WindowId) -> Subscription {
        Subscription {
            window,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for LocalBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster for LocalBroadcaster {
    fn notify_changed(&self, origin: WindowId) {
        // No receivers just means no other window is open
        let receivers = self.sender.send(origin).unwrap_or(0);
        debug!("{origin} broadcast a change to {receivers} listeners");
    }
}

/// One window's view of the change signals.
#[derive(Debug)]
pub struct Subscription {
    window: WindowId,
    receiver: broadcast::Receiver<WindowId>,
}

impl Subscription {
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Drain every pending signal without waiting. Returns whether any of them came from another
    /// window.
    pub fn take_changed(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.receiver.try_recv() {
                Ok(origin) => changed |= origin != self.window,
                // Dropped signals may have been foreign ones
                Err(TryRecvError::Lagged(skipped)) => {
                    trace!("{} lagged by {skipped} signals", self.window);
                    changed = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return changed,
            }
        }
    }

    /// Wait for the next signal from another window, then swallow whatever else is already
    /// queued. Returns `false` once every sender is gone.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(origin) if origin == self.window => continue,
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    self.take_changed();
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }
}
