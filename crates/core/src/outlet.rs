//! The downstream half of every reactive-set node.
//!
//! An `Outlet` combines the three things a node needs to face its
//! subscribers: the observer registry, the replay membership, and the
//! terminal state. Sources, bridges and operators each own one outlet and
//! push their output batches through it; the outlet's `SetHandle` is what
//! callers compose further.
//!
//! Notification always happens outside the outlet's internal borrow, so an
//! observer may synchronously subscribe, dispose, or mutate a source while
//! a batch is being delivered.

use crate::change::ChangeBatch;
use crate::error::Error;
use crate::membership::Membership;
use crate::observer::SharedObserver;
use crate::subscription::{subscription_for, Registry, Subscription};
use crate::token::Token;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

/// Terminal state of a stream.
#[derive(Clone)]
pub(crate) enum Terminal {
    Completed,
    Failed(Error),
}

struct OutletInner<T> {
    registry: Registry<SharedObserver<T>>,
    membership: Membership<T>,
    terminal: Option<Terminal>,
}

/// The subscriber-facing half of a node: registry, replay state, terminal.
pub struct Outlet<T> {
    inner: Rc<RefCell<OutletInner<T>>>,
}

impl<T> Clone for Outlet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for Outlet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Outlet<T> {
    /// Creates a live outlet with no subscribers and no members.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(OutletInner {
                registry: Registry::new(),
                membership: Membership::new(),
                terminal: None,
            })),
        }
    }

    /// Returns the polymorphic handle for this outlet.
    pub fn handle(&self) -> SetHandle<T> {
        SetHandle {
            outlet: self.clone(),
        }
    }

    /// Subscribes an observer: replay batch first, then live batches.
    ///
    /// Subscribing to a terminal outlet delivers no replay and the terminal
    /// callback immediately.
    pub fn subscribe(&self, observer: SharedObserver<T>) -> Subscription {
        let (replay, terminal, entry) = {
            let mut inner = self.inner.borrow_mut();
            match inner.terminal.clone() {
                Some(terminal) => (ChangeBatch::new(), Some(terminal), None),
                None => {
                    let entry = inner.registry.attach(observer.clone());
                    (inner.membership.replay(), None, Some(entry))
                }
            }
        };
        if !replay.is_empty() {
            observer.borrow_mut().on_next(&replay);
        }
        match terminal {
            Some(Terminal::Failed(error)) => observer.borrow_mut().on_error(error),
            Some(Terminal::Completed) => observer.borrow_mut().on_completed(),
            None => {}
        }
        match entry {
            Some(entry) => subscription_for(&entry),
            None => Subscription::empty(),
        }
    }

    /// Emits a batch to all subscribers. Empty batches are elided.
    ///
    /// # Panics
    ///
    /// Panics if the batch violates the lifetime algebra - an Add on a live
    /// token or an Update/Delete on a retired one. That is a producer bug;
    /// the offending mutation is aborted loudly rather than propagated.
    pub fn emit(&self, batch: ChangeBatch<T>) {
        if batch.is_empty() {
            return;
        }
        let targets = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            if let Err(error) = inner.membership.apply(&batch) {
                panic!("reactive set emitted an ill-formed batch: {}", error);
            }
            inner.registry.snapshot()
        };
        for entry in targets {
            if entry.is_active() {
                entry.observer.borrow_mut().on_next(&batch);
            }
        }
    }

    /// Fails the stream: drains active lifetimes into one final Delete
    /// batch, then delivers the error to every subscriber.
    pub fn fail(&self, error: Error) {
        let (deletes, targets) = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            let deletes = inner.membership.drain_to_deletes();
            inner.terminal = Some(Terminal::Failed(error.clone()));
            (deletes, inner.registry.snapshot())
        };
        if !deletes.is_empty() {
            for entry in &targets {
                if entry.is_active() {
                    entry.observer.borrow_mut().on_next(&deletes);
                }
            }
        }
        for entry in targets {
            if entry.is_active() {
                entry.observer.borrow_mut().on_error(error.clone());
            }
        }
    }

    /// Completes the stream: drains active lifetimes into one final Delete
    /// batch, then notifies completion.
    pub fn complete(&self) {
        let (deletes, targets) = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            let deletes = inner.membership.drain_to_deletes();
            inner.terminal = Some(Terminal::Completed);
            (deletes, inner.registry.snapshot())
        };
        if !deletes.is_empty() {
            for entry in &targets {
                if entry.is_active() {
                    entry.observer.borrow_mut().on_next(&deletes);
                }
            }
        }
        for entry in targets {
            if entry.is_active() {
                entry.observer.borrow_mut().on_completed();
            }
        }
    }

    /// The item currently carried by a live token.
    pub fn get(&self, token: Token) -> Option<T> {
        self.inner.borrow().membership.get(token).cloned()
    }

    /// Returns true if the token is live on this stream.
    pub fn contains(&self, token: Token) -> bool {
        self.inner.borrow().membership.contains(token)
    }

    /// Active lifetime count.
    pub fn len(&self) -> usize {
        self.inner.borrow().membership.len()
    }

    /// Returns true if no lifetime is active.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().membership.is_empty()
    }

    /// The active tokens, in no particular order.
    pub fn active_tokens(&self) -> Vec<Token> {
        self.inner.borrow().membership.tokens()
    }

    /// Returns true until `fail` or `complete` has run.
    pub fn is_live(&self) -> bool {
        self.inner.borrow().terminal.is_none()
    }

    /// Live subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().registry.len()
    }
}

/// A reactive-set handle: a stream of change batches that replays current
/// membership to each new subscriber. The only operation is `subscribe`.
pub struct SetHandle<T> {
    outlet: Outlet<T>,
}

impl<T> Clone for SetHandle<T> {
    fn clone(&self) -> Self {
        Self {
            outlet: self.outlet.clone(),
        }
    }
}

impl<T: Clone + 'static> SetHandle<T> {
    /// Subscribes an observer: replay batch first, then live batches.
    pub fn subscribe(&self, observer: SharedObserver<T>) -> Subscription {
        self.outlet.subscribe(observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::observer::from_fn;
    use alloc::vec;
    use alloc::vec::Vec;

    fn recorder() -> (SharedObserver<i32>, Rc<RefCell<Vec<ChangeBatch<i32>>>>) {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let batches_clone = batches.clone();
        let observer = from_fn(move |batch: &[Change<i32>]| {
            batches_clone.borrow_mut().push(batch.to_vec());
        });
        (observer, batches)
    }

    #[test]
    fn test_emit_reaches_subscribers() {
        let outlet: Outlet<i32> = Outlet::new();
        let (observer, batches) = recorder();
        outlet.subscribe(observer);

        let token = Token::mint();
        outlet.emit(vec![Change::Add(token, 1)]);

        assert_eq!(batches.borrow().len(), 1);
        assert_eq!(outlet.len(), 1);
    }

    #[test]
    fn test_empty_batch_elided() {
        let outlet: Outlet<i32> = Outlet::new();
        let (observer, batches) = recorder();
        outlet.subscribe(observer);

        outlet.emit(ChangeBatch::new());
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_late_subscriber_gets_replay() {
        let outlet: Outlet<i32> = Outlet::new();
        let a = Token::mint();
        let b = Token::mint();
        outlet.emit(vec![Change::Add(a, 1), Change::Add(b, 2)]);
        outlet.emit(vec![Change::Delete(b)]);

        let (observer, batches) = recorder();
        outlet.subscribe(observer);

        let replay = &batches.borrow()[0];
        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0], Change::Add(a, 1));
    }

    #[test]
    fn test_disposed_subscriber_stops_receiving() {
        let outlet: Outlet<i32> = Outlet::new();
        let (observer, batches) = recorder();
        let mut sub = outlet.subscribe(observer);

        outlet.emit(vec![Change::Add(Token::mint(), 1)]);
        sub.dispose();
        outlet.emit(vec![Change::Add(Token::mint(), 2)]);

        assert_eq!(batches.borrow().len(), 1);
    }

    #[test]
    fn test_fail_drains_then_errors() {
        struct Probe {
            batches: Rc<RefCell<Vec<ChangeBatch<i32>>>>,
            error: Rc<RefCell<Option<Error>>>,
        }
        impl crate::observer::SetObserver<i32> for Probe {
            fn on_next(&mut self, batch: &[Change<i32>]) {
                self.batches.borrow_mut().push(batch.to_vec());
            }
            fn on_error(&mut self, error: Error) {
                *self.error.borrow_mut() = Some(error);
            }
        }

        let outlet: Outlet<i32> = Outlet::new();
        let batches = Rc::new(RefCell::new(Vec::new()));
        let error = Rc::new(RefCell::new(None));
        outlet.subscribe(Rc::new(RefCell::new(Probe {
            batches: batches.clone(),
            error: error.clone(),
        })));

        let token = Token::mint();
        outlet.emit(vec![Change::Add(token, 1)]);
        outlet.fail(Error::upstream("boom"));

        assert_eq!(batches.borrow().len(), 2);
        assert_eq!(batches.borrow()[1], vec![Change::Delete(token)]);
        assert_eq!(*error.borrow(), Some(Error::upstream("boom")));
        assert!(outlet.is_empty());
        assert!(!outlet.is_live());
    }

    #[test]
    #[should_panic]
    fn test_ill_formed_batch_panics() {
        let outlet: Outlet<i32> = Outlet::new();
        let token = Token::mint();
        outlet.emit(vec![Change::Update(token, 1)]);
    }

    #[test]
    fn test_reentrant_subscribe_during_emit() {
        let outlet: Outlet<i32> = Outlet::new();
        let late_batches = Rc::new(RefCell::new(Vec::new()));

        let outlet_clone = outlet.clone();
        let late_clone = late_batches.clone();
        let first = from_fn(move |_batch: &[Change<i32>]| {
            let sink = late_clone.clone();
            outlet_clone.subscribe(from_fn(move |batch: &[Change<i32>]| {
                sink.borrow_mut().push(batch.to_vec());
            }));
        });
        outlet.subscribe(first);

        let token = Token::mint();
        outlet.emit(vec![Change::Add(token, 1)]);

        // The observer attached mid-batch saw only the replay.
        assert_eq!(late_batches.borrow().len(), 1);
        assert_eq!(late_batches.borrow()[0], vec![Change::Add(token, 1)]);
    }
}
