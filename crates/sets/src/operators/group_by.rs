//! The group-by operator.
//!
//! Partitions a reactive set into one nested reactive set per key. The
//! outer stream carries group lifetimes; each group's child set re-emits
//! the upstream tokens of its members (a partition renames nothing).
//! Within one upstream batch, child batches are delivered before the
//! single outer batch.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::{HashMap, HashSet};
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver, Token};

struct Group<T> {
    token: Token,
    child: Outlet<T>,
    members: HashSet<Token>,
}

/// Per-group changes staged while one upstream batch is processed, keyed by
/// the group's outer token so a drained-and-recreated key stays distinct.
struct Staged<T> {
    batches: Vec<(Token, Outlet<T>, ChangeBatch<T>)>,
    drained: Vec<Outlet<T>>,
    outer: ChangeBatch<SetHandle<T>>,
}

impl<T> Staged<T> {
    fn new() -> Self {
        Self {
            batches: Vec::new(),
            drained: Vec::new(),
            outer: ChangeBatch::new(),
        }
    }

    fn push(&mut self, group_token: Token, child: &Outlet<T>, change: Change<T>) {
        match self
            .batches
            .iter_mut()
            .find(|(token, _, _)| *token == group_token)
        {
            Some((_, _, batch)) => batch.push(change),
            None => self
                .batches
                .push((group_token, child.clone(), alloc::vec![change])),
        }
    }
}

struct GroupBy<T, K> {
    key_fn: Box<dyn Fn(&T) -> K>,
    groups: HashMap<K, Group<T>>,
    member_to_group: HashMap<Token, K>,
    outlet: Outlet<SetHandle<T>>,
}

impl<T, K> GroupBy<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone,
{
    fn insert_member(&mut self, key: K, token: Token, item: &T, staged: &mut Staged<T>) {
        let group = self.groups.entry(key.clone()).or_insert_with(|| {
            let child: Outlet<T> = Outlet::new();
            let group_token = Token::mint();
            staged.outer.push(Change::Add(group_token, child.handle()));
            Group {
                token: group_token,
                child,
                members: HashSet::new(),
            }
        });
        group.members.insert(token);
        let group_token = group.token;
        let child = group.child.clone();
        self.member_to_group.insert(token, key);
        staged.push(group_token, &child, Change::Add(token, item.clone()));
    }

    fn remove_member(&mut self, key: &K, token: Token, staged: &mut Staged<T>) {
        let drained = match self.groups.get_mut(key) {
            Some(group) => {
                group.members.remove(&token);
                let child = group.child.clone();
                staged.push(group.token, &child, Change::Delete(token));
                group.members.is_empty()
            }
            None => return,
        };
        if drained {
            if let Some(group) = self.groups.remove(key) {
                // The group Delete travels in the same outer batch that
                // drained it.
                staged.outer.push(Change::Delete(group.token));
                staged.drained.push(group.child);
            }
        }
    }
}

impl<T, K> SetObserver<T> for GroupBy<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
{
    fn on_next(&mut self, batch: &[Change<T>]) {
        let mut staged = Staged::new();
        for change in batch {
            match change {
                Change::Add(token, item) => {
                    let key = (self.key_fn)(item);
                    self.insert_member(key, *token, item, &mut staged);
                }
                Change::Update(token, item) => {
                    let new_key = (self.key_fn)(item);
                    let old_key = match self.member_to_group.get(token) {
                        Some(key) => key.clone(),
                        None => continue,
                    };
                    if old_key == new_key {
                        if let Some(group) = self.groups.get(&old_key) {
                            let (group_token, child) = (group.token, group.child.clone());
                            staged.push(group_token, &child, Change::Update(*token, item.clone()));
                        }
                    } else {
                        self.remove_member(&old_key, *token, &mut staged);
                        self.insert_member(new_key, *token, item, &mut staged);
                    }
                }
                Change::Delete(token) => {
                    if let Some(key) = self.member_to_group.remove(token) {
                        self.remove_member(&key, *token, &mut staged);
                    }
                }
            }
        }
        for (_, child, child_batch) in staged.batches {
            child.emit(child_batch);
        }
        for child in staged.drained {
            child.complete();
        }
        self.outlet.emit(staged.outer);
    }

    fn on_error(&mut self, error: Error) {
        for (_, group) in self.groups.drain() {
            group.child.fail(error.clone());
        }
        self.member_to_group.clear();
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        for (_, group) in self.groups.drain() {
            group.child.complete();
        }
        self.member_to_group.clear();
        self.outlet.complete();
    }
}

/// Partitions a reactive set by key into a reactive set of reactive sets.
///
/// A member whose update moves it to a new key leaves its old group (which
/// may drain, deleting the group) and enters the new one. Child sets replay
/// their members to late subscribers like any reactive set.
pub fn group_by<T, K>(
    source: &SetHandle<T>,
    key_fn: impl Fn(&T) -> K + 'static,
) -> SetHandle<SetHandle<T>>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(GroupBy {
        key_fn: Box::new(key_fn),
        groups: HashMap::new(),
        member_to_group: HashMap::new(),
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}
