//! Flat-map over keyed arrays.
//!
//! Each upstream item projects to a plain array of children, identified by
//! a child-key function. On upstream Update the new array is diffed against
//! the old one by child key: vanished keys Delete, new keys Add, surviving
//! keys keep their downstream token and Update only when the child value
//! moved.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver, Token};

struct FlatMapArray<T, U, KU> {
    project: Box<dyn Fn(&T) -> Vec<U>>,
    child_key: Box<dyn Fn(&U) -> KU>,
    parents: HashMap<Token, HashMap<KU, (Token, U)>>,
    outlet: Outlet<U>,
}

impl<T, U, KU> FlatMapArray<T, U, KU>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
    KU: Eq + Hash + Clone + 'static,
{
    /// Evaluates the array into a keyed map; late duplicates overwrite.
    fn keyed(&self, item: &T) -> HashMap<KU, U> {
        let children = (self.project)(item);
        let mut keyed = HashMap::with_capacity(children.len());
        for child in children {
            keyed.insert((self.child_key)(&child), child);
        }
        keyed
    }

    fn attach(&mut self, parent: Token, item: &T, out: &mut ChangeBatch<U>) {
        let mut entries = HashMap::new();
        for (key, child) in self.keyed(item) {
            let down = Token::mint();
            out.push(Change::Add(down, child.clone()));
            entries.insert(key, (down, child));
        }
        self.parents.insert(parent, entries);
    }

    fn diff(&mut self, parent: Token, item: &T, out: &mut ChangeBatch<U>) {
        let next = self.keyed(item);
        let old = self.parents.remove(&parent).unwrap_or_default();

        for (key, (down, _)) in &old {
            if !next.contains_key(key) {
                out.push(Change::Delete(*down));
            }
        }

        let mut entries = HashMap::with_capacity(next.len());
        for (key, child) in next {
            match old.get(&key) {
                Some((down, previous)) => {
                    if *previous != child {
                        out.push(Change::Update(*down, child.clone()));
                    }
                    entries.insert(key, (*down, child));
                }
                None => {
                    let down = Token::mint();
                    out.push(Change::Add(down, child.clone()));
                    entries.insert(key, (down, child));
                }
            }
        }
        self.parents.insert(parent, entries);
    }

    fn detach(&mut self, parent: Token, out: &mut ChangeBatch<U>) {
        if let Some(entries) = self.parents.remove(&parent) {
            for (_, (down, _)) in entries {
                out.push(Change::Delete(down));
            }
        }
    }
}

impl<T, U, KU> SetObserver<T> for FlatMapArray<T, U, KU>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
    KU: Eq + Hash + Clone + 'static,
{
    fn on_next(&mut self, batch: &[Change<T>]) {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(token, item) => self.attach(*token, item, &mut out),
                Change::Update(token, item) => self.diff(*token, item, &mut out),
                Change::Delete(token) => self.detach(*token, &mut out),
            }
        }
        self.outlet.emit(out);
    }

    fn on_error(&mut self, error: Error) {
        self.parents.clear();
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        self.parents.clear();
        self.outlet.complete();
    }
}

/// Flattens each item's projected array into the downstream set, keyed per
/// child so array re-evaluations churn only what actually changed.
pub fn flat_map_array<T, U, KU>(
    source: &SetHandle<T>,
    project: impl Fn(&T) -> Vec<U> + 'static,
    child_key: impl Fn(&U) -> KU + 'static,
) -> SetHandle<U>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
    KU: Eq + Hash + Clone + 'static,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(FlatMapArray {
        project: Box::new(project),
        child_key: Box::new(child_key),
        parents: HashMap::new(),
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}
