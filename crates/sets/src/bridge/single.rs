//! Bridge from a value stream to a one-lifetime reactive set.

use alloc::rc::Rc;
use alloc::vec;
use core::cell::RefCell;
use rill_core::stream::{ValueObserver, ValueSource};
use rill_core::{Change, Error, Outlet, SetHandle, Token};

struct SingleLifetime<T> {
    current: Option<Token>,
    outlet: Outlet<T>,
}

impl<T: Clone + 'static> ValueObserver<T> for SingleLifetime<T> {
    fn on_next(&mut self, value: &T) {
        match self.current {
            Some(token) => self.outlet.emit(vec![Change::Update(token, value.clone())]),
            None => {
                let token = Token::mint();
                self.current = Some(token);
                self.outlet.emit(vec![Change::Add(token, value.clone())]);
            }
        }
    }

    fn on_error(&mut self, error: Error) {
        // The fail cascade drains the lifetime into a final Delete batch
        // before the error reaches subscribers.
        self.current = None;
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        // The lifetime ends but the downstream set stays open.
        if let Some(token) = self.current.take() {
            self.outlet.emit(vec![Change::Delete(token)]);
        }
    }
}

/// Adapts a push-stream of values into a reactive set holding at most one
/// lifetime: the first value Adds it, later values Update it, completion
/// Deletes it while the set stays open, and an error Deletes then fails.
pub fn single_lifetime<T, S>(source: &S) -> SetHandle<T>
where
    T: Clone + 'static,
    S: ValueSource<T>,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(SingleLifetime {
        current: None,
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}
