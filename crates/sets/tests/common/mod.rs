//! Shared recording observers for the integration suites.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rill_sets::{Change, ChangeBatch, Error, SetHandle, SetObserver, Subscription};

struct Inner<T> {
    batches: Vec<ChangeBatch<T>>,
    error: Option<Error>,
    completed: bool,
}

struct RecorderObserver<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: Clone> SetObserver<T> for RecorderObserver<T> {
    fn on_next(&mut self, batch: &[Change<T>]) {
        self.inner.borrow_mut().batches.push(batch.to_vec());
    }

    fn on_error(&mut self, error: Error) {
        self.inner.borrow_mut().error = Some(error);
    }

    fn on_completed(&mut self) {
        self.inner.borrow_mut().completed = true;
    }
}

/// Records every delivery from one reactive set.
pub struct Recorder<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: Clone + 'static> Recorder<T> {
    pub fn attach(set: &SetHandle<T>) -> Self {
        Self::attach_with_subscription(set).0
    }

    pub fn attach_with_subscription(set: &SetHandle<T>) -> (Self, Subscription) {
        let inner = Rc::new(RefCell::new(Inner {
            batches: Vec::new(),
            error: None,
            completed: false,
        }));
        let subscription = set.subscribe(Rc::new(RefCell::new(RecorderObserver {
            inner: inner.clone(),
        })));
        (Self { inner }, subscription)
    }

    pub fn batches(&self) -> Vec<ChangeBatch<T>> {
        self.inner.borrow().batches.clone()
    }

    pub fn batch_count(&self) -> usize {
        self.inner.borrow().batches.len()
    }

    pub fn batch(&self, index: usize) -> ChangeBatch<T> {
        self.inner.borrow().batches[index].clone()
    }

    pub fn last_batch(&self) -> ChangeBatch<T> {
        self.inner.borrow().batches.last().cloned().unwrap()
    }

    pub fn error(&self) -> Option<Error> {
        self.inner.borrow().error.clone()
    }

    pub fn is_completed(&self) -> bool {
        self.inner.borrow().completed
    }

    /// Membership reconstructed from the recorded prefix, keyed by raw
    /// token identity.
    pub fn live(&self) -> BTreeMap<u64, T> {
        let mut live = BTreeMap::new();
        for batch in self.inner.borrow().batches.iter() {
            for change in batch {
                match change {
                    Change::Add(token, item) | Change::Update(token, item) => {
                        live.insert(token.raw(), item.clone());
                    }
                    Change::Delete(token) => {
                        live.remove(&token.raw());
                    }
                }
            }
        }
        live
    }

    /// The live items, sorted, for membership comparisons that ignore
    /// token identity.
    pub fn live_values(&self) -> Vec<T>
    where
        T: Ord,
    {
        let mut values: Vec<T> = self.live().into_values().collect();
        values.sort();
        values
    }
}
