//! The materialized view sink.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;
use rill_core::{Change, SetHandle, SetObserver, Subscription, Token};

struct ViewState<T, K> {
    key_fn: Box<dyn Fn(&T) -> K>,
    by_token: HashMap<Token, K>,
    by_key: HashMap<K, (Token, T)>,
}

impl<T, K> ViewState<T, K>
where
    T: Clone,
    K: Eq + Hash + Clone,
{
    fn apply(&mut self, batch: &[Change<T>]) {
        for change in batch {
            match change {
                Change::Add(token, item) => {
                    let key = (self.key_fn)(item);
                    self.by_token.insert(*token, key.clone());
                    self.by_key.insert(key, (*token, item.clone()));
                }
                Change::Update(token, item) => {
                    let new_key = (self.key_fn)(item);
                    if let Some(old_key) = self.by_token.get(token) {
                        if *old_key != new_key {
                            let old_key = old_key.clone();
                            self.by_key.remove(&old_key);
                        }
                    }
                    self.by_token.insert(*token, new_key.clone());
                    self.by_key.insert(new_key, (*token, item.clone()));
                }
                Change::Delete(token) => {
                    if let Some(key) = self.by_token.remove(token) {
                        // Drop the keyed entry only if it is still ours.
                        if self.by_key.get(&key).map(|(t, _)| *t == *token) == Some(true) {
                            self.by_key.remove(&key);
                        }
                    }
                }
            }
        }
    }
}

struct ViewObserver<T, K> {
    state: Rc<RefCell<ViewState<T, K>>>,
}

impl<T, K> SetObserver<T> for ViewObserver<T, K>
where
    T: Clone,
    K: Eq + Hash + Clone,
{
    fn on_next(&mut self, batch: &[Change<T>]) {
        self.state.borrow_mut().apply(batch);
    }
}

/// A synchronously queryable keyed view of a reactive set.
///
/// The view follows the source exactly: after a mutation on the same
/// pipeline returns, the view reflects it. Disposing the view detaches it;
/// further upstream changes are no longer reflected.
pub struct MaterializedView<T, K> {
    state: Rc<RefCell<ViewState<T, K>>>,
    subscription: Subscription,
}

impl<T, K> MaterializedView<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
{
    /// Current member count.
    pub fn len(&self) -> usize {
        self.state.borrow().by_key.len()
    }

    /// Returns true if the view holds no members.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().by_key.is_empty()
    }

    /// The current items, in no particular order.
    pub fn items(&self) -> Vec<T> {
        self.state
            .borrow()
            .by_key
            .values()
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// The item under the key, if present.
    pub fn get(&self, key: &K) -> Option<T> {
        self.state
            .borrow()
            .by_key
            .get(key)
            .map(|(_, item)| item.clone())
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.state.borrow().by_key.contains_key(key)
    }

    /// Detaches the view from its source. Idempotent.
    pub fn dispose(&mut self) {
        self.subscription.dispose();
    }
}

/// Materializes a reactive set into a queryable keyed view.
pub fn materialize<T, K>(
    source: &SetHandle<T>,
    key_fn: impl Fn(&T) -> K + 'static,
) -> MaterializedView<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
{
    let state = Rc::new(RefCell::new(ViewState {
        key_fn: Box::new(key_fn),
        by_token: HashMap::new(),
        by_key: HashMap::new(),
    }));
    let subscription = source.subscribe(Rc::new(RefCell::new(ViewObserver {
        state: state.clone(),
    })));
    MaterializedView {
        state,
        subscription,
    }
}
