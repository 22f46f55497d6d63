//! The map operator.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver};

struct Map<T, U> {
    project: Box<dyn Fn(&T) -> U>,
    outlet: Outlet<U>,
}

impl<T, U> SetObserver<T> for Map<T, U>
where
    T: Clone,
    U: Clone + 'static,
{
    fn on_next(&mut self, batch: &[Change<T>]) {
        let out: ChangeBatch<U> = batch
            .iter()
            .map(|change| change.map(|value| (self.project)(value)))
            .collect();
        self.outlet.emit(out);
    }

    fn on_error(&mut self, error: Error) {
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        self.outlet.complete();
    }
}

/// Projects every carried item through a pure function. Stateless; tokens
/// pass through 1:1.
pub fn map<T, U>(source: &SetHandle<T>, project: impl Fn(&T) -> U + 'static) -> SetHandle<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(Map {
        project: Box::new(project),
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}
