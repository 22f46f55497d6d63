//! Subscription management.
//!
//! Subscribing to a reactive set or value stream returns a `Subscription`:
//! a disposable cancellation handle. Disposal detaches the observer and is
//! idempotent; it does not emit Delete events. Dropping an undisposed
//! subscription leaves the observer attached - operators rely on this to
//! stay subscribed for the lifetime of the graph.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::Cell;

/// A disposable cancellation handle for one subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a subscription that runs the given cancellation on dispose.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates an already-disposed subscription.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Detaches the observer. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Returns true once `dispose` has run.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_none()
    }
}

/// One registered observer, with a deactivation flag consulted before every
/// delivery so a disposed observer stops receiving callbacks immediately.
pub(crate) struct Entry<O> {
    pub observer: O,
    active: Cell<bool>,
}

impl<O> Entry<O> {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[inline]
    pub fn deactivate(&self) {
        self.active.set(false);
    }
}

/// The observer registry backing every publisher.
///
/// Notification runs against a snapshot of the entries, so observers may
/// re-enter (subscribe, dispose) while a batch is being delivered; newly
/// attached observers only see subsequent batches.
pub(crate) struct Registry<O> {
    entries: Vec<Rc<Entry<O>>>,
}

impl<O> Registry<O> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers an observer, returning its entry.
    pub fn attach(&mut self, observer: O) -> Rc<Entry<O>> {
        let entry = Rc::new(Entry {
            observer,
            active: Cell::new(true),
        });
        self.entries.push(entry.clone());
        entry
    }

    /// Sweeps deactivated entries and returns a snapshot of the live ones.
    pub fn snapshot(&mut self) -> Vec<Rc<Entry<O>>> {
        self.entries.retain(|entry| entry.is_active());
        self.entries.clone()
    }

    /// Number of live observers.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }
}

/// Builds the disposal handle for a registry entry.
pub(crate) fn subscription_for<O: 'static>(entry: &Rc<Entry<O>>) -> Subscription {
    let weak: Weak<Entry<O>> = Rc::downgrade(entry);
    Subscription::new(move || {
        if let Some(entry) = weak.upgrade() {
            entry.deactivate();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_idempotent() {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        let mut sub = Subscription::new(move || {
            count_clone.set(count_clone.get() + 1);
        });

        assert!(!sub.is_disposed());
        sub.dispose();
        sub.dispose();

        assert!(sub.is_disposed());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_registry_attach_and_sweep() {
        let mut registry: Registry<u32> = Registry::new();

        let a = registry.attach(1);
        let _b = registry.attach(2);
        assert_eq!(registry.len(), 2);

        a.deactivate();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn test_subscription_detaches_entry() {
        let mut registry: Registry<u32> = Registry::new();
        let entry = registry.attach(1);

        let mut sub = subscription_for(&entry);
        sub.dispose();

        assert!(!entry.is_active());
        assert_eq!(registry.snapshot().len(), 0);
    }
}
