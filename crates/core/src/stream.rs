//! Single-value push-streams.
//!
//! Bridges consume foreign push-streams through the `ValueSource` trait and
//! sinks produce them; `ValueStream` is the in-crate subject implementation.
//! Unlike a reactive set, a value stream has no replay: a subscriber only
//! sees values pushed after it attached, plus the terminal callback.

use crate::error::Error;
use crate::outlet::Terminal;
use crate::subscription::{subscription_for, Registry, Subscription};
use alloc::rc::Rc;
use core::cell::RefCell;

/// An observer of single values.
pub trait ValueObserver<T> {
    /// Called with each pushed value.
    fn on_next(&mut self, value: &T);

    /// Called when the stream fails.
    fn on_error(&mut self, error: Error) {
        let _ = error;
    }

    /// Called when the stream ends cleanly.
    fn on_completed(&mut self) {}
}

/// Shared, interiorly mutable value observer handle.
pub type SharedValueObserver<T> = Rc<RefCell<dyn ValueObserver<T>>>;

/// Anything a value observer can be subscribed to.
pub trait ValueSource<T> {
    /// Subscribes an observer, returning a disposable handle.
    fn subscribe(&self, observer: SharedValueObserver<T>) -> Subscription;
}

struct StreamInner<T> {
    registry: Registry<SharedValueObserver<T>>,
    terminal: Option<Terminal>,
}

/// A push-stream subject: values go to current subscribers, terminals are
/// sticky. Pushing after a terminal is ignored.
pub struct ValueStream<T> {
    inner: Rc<RefCell<StreamInner<T>>>,
}

impl<T> Clone for ValueStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for ValueStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ValueStream<T> {
    /// Creates a live stream with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StreamInner {
                registry: Registry::new(),
                terminal: None,
            })),
        }
    }

    /// Pushes a value to every current subscriber.
    pub fn push(&self, value: T) {
        let targets = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            inner.registry.snapshot()
        };
        for entry in targets {
            if entry.is_active() {
                entry.observer.borrow_mut().on_next(&value);
            }
        }
    }

    /// Fails the stream; subscribers receive `on_error`.
    pub fn fail(&self, error: Error) {
        let targets = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(Terminal::Failed(error.clone()));
            inner.registry.snapshot()
        };
        for entry in targets {
            if entry.is_active() {
                entry.observer.borrow_mut().on_error(error.clone());
            }
        }
    }

    /// Completes the stream; subscribers receive `on_completed`.
    pub fn complete(&self) {
        let targets = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(Terminal::Completed);
            inner.registry.snapshot()
        };
        for entry in targets {
            if entry.is_active() {
                entry.observer.borrow_mut().on_completed();
            }
        }
    }

    /// Returns true until `fail` or `complete` has run.
    pub fn is_live(&self) -> bool {
        self.inner.borrow().terminal.is_none()
    }
}

impl<T: 'static> ValueSource<T> for ValueStream<T> {
    fn subscribe(&self, observer: SharedValueObserver<T>) -> Subscription {
        let (terminal, entry) = {
            let mut inner = self.inner.borrow_mut();
            match inner.terminal.clone() {
                Some(terminal) => (Some(terminal), None),
                None => (None, Some(inner.registry.attach(observer.clone()))),
            }
        };
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
}

struct FnValueObserver<F> {
    callback: F,
}

impl<T, F> ValueObserver<T> for FnValueObserver<F>
where
    F: FnMut(&T),
{
    fn on_next(&mut self, value: &T) {
        (self.callback)(value);
    }
}

/// Wraps a closure as a value observer that ignores terminal callbacks.
pub fn observer_from_fn<T, F>(callback: F) -> SharedValueObserver<T>
where
    T: 'static,
    F: FnMut(&T) + 'static,
{
    Rc::new(RefCell::new(FnValueObserver { callback }))
}
