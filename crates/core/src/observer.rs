//! Batch observers.

use crate::change::Change;
use crate::error::Error;
use alloc::rc::Rc;
use core::cell::RefCell;

/// An observer of reactive-set change batches.
///
/// `on_next` receives every batch; `on_error` and `on_completed` are
/// terminal - no further callbacks follow either.
pub trait SetObserver<T> {
    /// Called with each change batch, including the initial replay batch.
    fn on_next(&mut self, batch: &[Change<T>]);

    /// Called when the stream fails. Active lifetimes have already been
    /// drained by a final Delete batch.
    fn on_error(&mut self, error: Error) {
        let _ = error;
    }

    /// Called when the stream ends cleanly.
    fn on_completed(&mut self) {}
}

/// Shared, interiorly mutable observer handle, as stored by publishers.
pub type SharedObserver<T> = Rc<RefCell<dyn SetObserver<T>>>;

struct FnObserver<F> {
    callback: F,
}

impl<T, F> SetObserver<T> for FnObserver<F>
where
    F: FnMut(&[Change<T>]),
{
    fn on_next(&mut self, batch: &[Change<T>]) {
        (self.callback)(batch);
    }
}

/// Wraps a closure as a batch observer that ignores terminal callbacks.
pub fn from_fn<T, F>(callback: F) -> SharedObserver<T>
where
    T: 'static,
    F: FnMut(&[Change<T>]) + 'static,
{
    Rc::new(RefCell::new(FnObserver { callback }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_from_fn_receives_batches() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let observer = from_fn(move |batch: &[Change<i32>]| {
            seen_clone.borrow_mut().extend_from_slice(batch);
        });

        let token = Token::mint();
        observer.borrow_mut().on_next(&[Change::Add(token, 1)]);
        observer.borrow_mut().on_next(&vec![Change::Delete(token)]);

        assert_eq!(seen.borrow().len(), 2);
    }
}
