//! Flat-map over reactive children.
//!
//! Each upstream item projects to a child reactive set; the operator
//! subscribes to every child and flattens their members into one downstream
//! stream, minting a downstream token per child lifetime. When an upstream
//! item is updated, the old child subscription is dropped and the new
//! child's replay batch is diffed against the previous mapping, so child
//! lifetimes present in both keep their downstream tokens.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::mem;
use hashbrown::HashMap;
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver, Subscription, Token};

enum Mode<U> {
    /// Child events emit downstream immediately, one batch per child batch.
    Live,
    /// Child events are staged into the parent's in-flight batch.
    Collect(ChangeBatch<U>),
    /// The child's replay is diffed against the prior mapping.
    Diff {
        previous: HashMap<Token, Token>,
        staged: ChangeBatch<U>,
    },
}

struct ChildBridge<U> {
    mapping: HashMap<Token, Token>,
    mode: Mode<U>,
    outlet: Outlet<U>,
}

impl<U: Clone + PartialEq + 'static> ChildBridge<U> {
    fn translate(&mut self, batch: &[Change<U>]) -> ChangeBatch<U> {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(child, value) => {
                    let down = Token::mint();
                    self.mapping.insert(*child, down);
                    out.push(Change::Add(down, value.clone()));
                }
                Change::Update(child, value) => {
                    if let Some(down) = self.mapping.get(child) {
                        out.push(Change::Update(*down, value.clone()));
                    }
                }
                Change::Delete(child) => {
                    if let Some(down) = self.mapping.remove(child) {
                        out.push(Change::Delete(down));
                    }
                }
            }
        }
        out
    }

    fn diff_replay(&mut self, batch: &[Change<U>]) {
        let (mut previous, mut staged) = match mem::replace(&mut self.mode, Mode::Live) {
            Mode::Diff { previous, staged } => (previous, staged),
            other => {
                self.mode = other;
                return;
            }
        };
        for change in batch {
            match change {
                Change::Add(child, value) => match previous.remove(child) {
                    Some(down) => {
                        // Surviving child lifetime: keep the downstream
                        // token, update only when the value moved.
                        self.mapping.insert(*child, down);
                        if self.outlet.get(down).as_ref() != Some(value) {
                            staged.push(Change::Update(down, value.clone()));
                        }
                    }
                    None => {
                        let down = Token::mint();
                        self.mapping.insert(*child, down);
                        staged.push(Change::Add(down, value.clone()));
                    }
                },
                Change::Update(child, value) => {
                    if let Some(down) = self.mapping.get(child) {
                        staged.push(Change::Update(*down, value.clone()));
                    }
                }
                Change::Delete(child) => {
                    if let Some(down) = self.mapping.remove(child) {
                        staged.push(Change::Delete(down));
                    }
                }
            }
        }
        self.mode = Mode::Diff { previous, staged };
    }
}

impl<U: Clone + PartialEq + 'static> SetObserver<U> for ChildBridge<U> {
    fn on_next(&mut self, batch: &[Change<U>]) {
        if let Mode::Diff { .. } = self.mode {
            self.diff_replay(batch);
            return;
        }
        let out = self.translate(batch);
        match &mut self.mode {
            Mode::Collect(buffer) => buffer.extend(out),
            _ => self.outlet.emit(out),
        }
    }

    fn on_error(&mut self, _error: Error) {
        // A failing child has already drained its lifetimes through its
        // final Delete batch; the failure stays local to that child.
    }
}

struct Parent<U> {
    bridge: Rc<RefCell<ChildBridge<U>>>,
    subscription: Subscription,
}

struct FlatMapSet<T, U> {
    project: Box<dyn Fn(&T) -> SetHandle<U>>,
    parents: HashMap<Token, Parent<U>>,
    outlet: Outlet<U>,
}

impl<T, U> FlatMapSet<T, U>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
{
    fn attach_child(&mut self, parent: Token, item: &T, out: &mut ChangeBatch<U>) {
        let child = (self.project)(item);
        let bridge = Rc::new(RefCell::new(ChildBridge {
            mapping: HashMap::new(),
            mode: Mode::Collect(ChangeBatch::new()),
            outlet: self.outlet.clone(),
        }));
        let subscription = child.subscribe(bridge.clone());
        {
            let mut bridge = bridge.borrow_mut();
            if let Mode::Collect(buffer) = mem::replace(&mut bridge.mode, Mode::Live) {
                out.extend(buffer);
            }
        }
        self.parents.insert(parent, Parent {
            bridge,
            subscription,
        });
    }

    fn replace_child(&mut self, parent: Token, item: &T, out: &mut ChangeBatch<U>) {
        let previous = match self.parents.remove(&parent) {
            Some(mut old) => {
                old.subscription.dispose();
                mem::take(&mut old.bridge.borrow_mut().mapping)
            }
            None => HashMap::new(),
        };
        let child = (self.project)(item);
        let bridge = Rc::new(RefCell::new(ChildBridge {
            mapping: HashMap::new(),
            mode: Mode::Diff {
                previous,
                staged: ChangeBatch::new(),
            },
            outlet: self.outlet.clone(),
        }));
        let subscription = child.subscribe(bridge.clone());
        {
            let mut bridge = bridge.borrow_mut();
            if let Mode::Diff { previous, staged } = mem::replace(&mut bridge.mode, Mode::Live) {
                out.extend(staged);
                for (_, down) in previous {
                    out.push(Change::Delete(down));
                }
            }
        }
        self.parents.insert(parent, Parent {
            bridge,
            subscription,
        });
    }

    fn detach_child(&mut self, parent: Token, out: &mut ChangeBatch<U>) {
        if let Some(mut old) = self.parents.remove(&parent) {
            old.subscription.dispose();
            for (_, down) in old.bridge.borrow_mut().mapping.drain() {
                out.push(Change::Delete(down));
            }
        }
    }

    fn teardown(&mut self) {
        for (_, mut parent) in self.parents.drain() {
            parent.subscription.dispose();
        }
    }
}

impl<T, U> SetObserver<T> for FlatMapSet<T, U>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
{
    fn on_next(&mut self, batch: &[Change<T>]) {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(token, item) => self.attach_child(*token, item, &mut out),
                Change::Update(token, item) => self.replace_child(*token, item, &mut out),
                Change::Delete(token) => self.detach_child(*token, &mut out),
            }
        }
        self.outlet.emit(out);
    }

    fn on_error(&mut self, error: Error) {
        self.teardown();
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        self.teardown();
        self.outlet.complete();
    }
}

/// Flattens a reactive set of items into the members of their projected
/// child sets. Downstream tokens are minted per child lifetime and survive
/// an upstream Update wherever the new child still carries the same child
/// lifetime.
pub fn flat_map_set<T, U>(
    source: &SetHandle<T>,
    project: impl Fn(&T) -> SetHandle<U> + 'static,
) -> SetHandle<U>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(FlatMapSet {
        project: Box::new(project),
        parents: HashMap::new(),
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{constant, MutableSet};
    use alloc::vec;
    use alloc::vec::Vec;
    use rill_core::observer::from_fn;
    use rill_core::ChangeBatchExt;

    fn record(set: &SetHandle<i32>) -> Rc<RefCell<Vec<ChangeBatch<i32>>>> {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let batches_clone = batches.clone();
        set.subscribe(from_fn(move |batch: &[Change<i32>]| {
            batches_clone.borrow_mut().push(batch.to_vec());
        }));
        batches
    }

    #[test]
    fn test_parent_add_flattens_child_replay() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p);
        let child = constant(vec![1, 2, 3]);
        let flat = flat_map_set(&parents.handle(), move |_| child.clone());
        let batches = record(&flat);

        parents.add(7).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].add_count(), 3);
    }

    #[test]
    fn test_live_child_events_flow() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p);
        let child: MutableSet<i32, i32> = MutableSet::new(|x: &i32| *x % 100);
        let child_handle = child.handle();
        let flat = flat_map_set(&parents.handle(), move |_| child_handle.clone());
        let batches = record(&flat);

        parents.add(7).unwrap();
        child.add(1).unwrap();
        child.update(101).unwrap();
        child.delete(&1).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 3);
        assert!(batches[0][0].is_add());
        assert!(batches[1][0].is_update());
        assert!(batches[2][0].is_delete());
        assert_eq!(batches[0][0].token(), batches[2][0].token());
    }

    #[test]
    fn test_downstream_tokens_differ_from_child_tokens() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p);
        let child = constant(vec![1]);

        let child_tokens = Rc::new(RefCell::new(Vec::new()));
        let child_tokens_clone = child_tokens.clone();
        child.subscribe(from_fn(move |batch: &[Change<i32>]| {
            for change in batch {
                child_tokens_clone.borrow_mut().push(change.token());
            }
        }));

        let flat = flat_map_set(&parents.handle(), move |_| child.clone());
        let batches = record(&flat);
        parents.add(7).unwrap();

        assert_ne!(batches.borrow()[0][0].token(), child_tokens.borrow()[0]);
    }

    #[test]
    fn test_update_to_same_child_preserves_tokens() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p);
        let child = constant(vec![1, 2]);
        let flat = flat_map_set(&parents.handle(), move |_| child.clone());
        let batches = record(&flat);

        parents.add(7).unwrap();
        parents.update(7).unwrap();

        let batches = batches.borrow();
        // The re-projected child carries the same lifetimes and values, so
        // the update produces no downstream batch.
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_update_to_different_child_swaps_members() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p % 10);
        let child_a = constant(vec![1, 2]);
        let child_b = constant(vec![3]);
        let flat = flat_map_set(&parents.handle(), move |p| {
            if *p < 10 {
                child_a.clone()
            } else {
                child_b.clone()
            }
        });
        let batches = record(&flat);

        parents.add(7).unwrap();
        parents.update(17).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        let swapped = &batches[1];
        assert_eq!(swapped.add_count(), 1);
        assert_eq!(swapped.delete_count(), 2);
    }

    #[test]
    fn test_parent_delete_drains_children() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p);
        let child = constant(vec![1, 2]);
        let flat = flat_map_set(&parents.handle(), move |_| child.clone());
        let batches = record(&flat);

        parents.add(7).unwrap();
        parents.delete(&7).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].delete_count(), 2);
    }

    #[test]
    fn test_two_parents_same_child_mint_disjoint_tokens() {
        let parents: MutableSet<u32, u32> = MutableSet::new(|p: &u32| *p);
        let child = constant(vec![1]);
        let flat = flat_map_set(&parents.handle(), move |_| child.clone());
        let batches = record(&flat);

        parents.add(7).unwrap();
        parents.add(8).unwrap();

        let batches = batches.borrow();
        assert_ne!(batches[0][0].token(), batches[1][0].token());
    }
}
