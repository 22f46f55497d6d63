//! Bridge from a stream of streams to a reactive set.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use rill_core::stream::{ValueObserver, ValueSource};
use rill_core::{Change, Error, Outlet, SetHandle, Subscription, Token};

struct InnerLifetime<T> {
    token: Option<Token>,
    terminated: bool,
    outlet: Outlet<T>,
}

impl<T: Clone + 'static> ValueObserver<T> for InnerLifetime<T> {
    fn on_next(&mut self, value: &T) {
        match self.token {
            Some(token) => self.outlet.emit(vec![Change::Update(token, value.clone())]),
            None => {
                let token = Token::mint();
                self.token = Some(token);
                self.outlet.emit(vec![Change::Add(token, value.clone())]);
            }
        }
    }

    fn on_error(&mut self, _error: Error) {
        // Inner failures are local: the lifetime ends, the set stays open.
        self.terminated = true;
        if let Some(token) = self.token.take() {
            self.outlet.emit(vec![Change::Delete(token)]);
        }
    }

    fn on_completed(&mut self) {
        self.terminated = true;
        if let Some(token) = self.token.take() {
            self.outlet.emit(vec![Change::Delete(token)]);
        }
    }
}

struct MultiLifetime<T> {
    outlet: Outlet<T>,
    inners: Vec<(Rc<RefCell<InnerLifetime<T>>>, Subscription)>,
}

impl<T, S> ValueObserver<S> for MultiLifetime<T>
where
    T: Clone + 'static,
    S: ValueSource<T>,
{
    fn on_next(&mut self, inner_stream: &S) {
        self.inners
            .retain(|(inner, _)| !inner.borrow().terminated);
        let inner = Rc::new(RefCell::new(InnerLifetime {
            token: None,
            terminated: false,
            outlet: self.outlet.clone(),
        }));
        let subscription = inner_stream.subscribe(inner.clone());
        self.inners.push((inner, subscription));
    }

    fn on_error(&mut self, error: Error) {
        // Outer failure: one combined Delete batch for every active inner
        // (the fail cascade drains the membership), then the error.
        for (_, subscription) in &mut self.inners {
            subscription.dispose();
        }
        self.inners.clear();
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        // No further inner streams can arrive; existing inners continue and
        // the downstream set stays open.
    }
}

/// Adapts a push-stream of inner push-streams into a reactive set where
/// each inner stream contributes one lifetime: first value Adds, later
/// values Update, inner completion or failure Deletes. Only an outer
/// failure fails the set.
pub fn multi_lifetime<T, S, O>(source: &O) -> SetHandle<T>
where
    T: Clone + 'static,
    S: ValueSource<T> + 'static,
    O: ValueSource<S>,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(MultiLifetime {
        outlet: outlet.clone(),
        inners: Vec::new(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}
