//! Advance-signal listener with scoped activation.
//!
//! The host only routes Space/Enter/click to the interpreter while the
//! listener is active. Activation hands out a [`ListenerGuard`]; dropping
//! the guard switches the listener off again, so every exit from dialogue
//! mode (exhausted scene, declined choice, host cancel) releases it.

use std::cell::Cell;
use std::rc::Rc;

/// Shared on/off switch. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct AdvanceListener {
    active: Rc<Cell<bool>>,
}

impl AdvanceListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Switch the listener on until the returned guard is dropped
    pub fn activate(&self) -> ListenerGuard {
        if self.active.replace(true) {
            tracing::warn!("Advance listener activated twice");
        } else {
            tracing::debug!("Advance listener on");
        }
        ListenerGuard {
            active: Rc::clone(&self.active),
        }
    }
}

/// Keeps the listener active while alive
#[derive(Debug)]
pub struct ListenerGuard {
    active: Rc<Cell<bool>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.active.set(false);
        tracing::debug!("Advance listener off");
    }
}
