//! The imperative keyed source.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use core::cell::RefCell;
use core::fmt;
use core::hash::Hash;
use hashbrown::HashMap;
use rill_core::{Change, Error, Outlet, Result, SetHandle, Token};

struct MutableInner<T, K> {
    key_fn: Box<dyn Fn(&T) -> K>,
    tokens: HashMap<K, Token>,
}

/// A mutable reactive set driven by imperative add/update/delete calls.
///
/// Items are identified by a caller-supplied key function; each active key
/// holds exactly one lifetime. The set never completes and never errors -
/// the only failures are the synchronous `DuplicateKey`/`AbsentKey` results,
/// which leave the set unchanged and emit nothing.
pub struct MutableSet<T, K> {
    inner: Rc<RefCell<MutableInner<T, K>>>,
    outlet: Outlet<T>,
}

impl<T, K> Clone for MutableSet<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            outlet: self.outlet.clone(),
        }
    }
}

impl<T, K> MutableSet<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    /// Creates an empty mutable set keyed by `key_fn`.
    pub fn new(key_fn: impl Fn(&T) -> K + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MutableInner {
                key_fn: Box::new(key_fn),
                tokens: HashMap::new(),
            })),
            outlet: Outlet::new(),
        }
    }

    /// Returns the reactive-set handle for this source.
    pub fn handle(&self) -> SetHandle<T> {
        self.outlet.handle()
    }

    /// Adds an item under its key, beginning a fresh lifetime.
    ///
    /// Fails with `DuplicateKey` if the key is already active.
    pub fn add(&self, item: T) -> Result<()> {
        let token = {
            let mut inner = self.inner.borrow_mut();
            let key = (inner.key_fn)(&item);
            if inner.tokens.contains_key(&key) {
                return Err(Error::duplicate_key(&key));
            }
            let token = Token::mint();
            inner.tokens.insert(key, token);
            token
        };
        self.outlet.emit(vec![Change::Add(token, item)]);
        Ok(())
    }

    /// Replaces the item under its key, keeping the existing lifetime.
    ///
    /// Fails with `AbsentKey` if the key is not active. A redundant update
    /// (same value) still emits.
    pub fn update(&self, item: T) -> Result<()> {
        let token = {
            let inner = self.inner.borrow();
            let key = (inner.key_fn)(&item);
            match inner.tokens.get(&key) {
                Some(token) => *token,
                None => return Err(Error::absent_key(&key)),
            }
        };
        self.outlet.emit(vec![Change::Update(token, item)]);
        Ok(())
    }

    /// Ends the lifetime under the key.
    ///
    /// Fails with `AbsentKey` if the key is not active.
    pub fn delete(&self, key: &K) -> Result<()> {
        let token = {
            let mut inner = self.inner.borrow_mut();
            match inner.tokens.remove(key) {
                Some(token) => token,
                None => return Err(Error::absent_key(key)),
            }
        };
        self.outlet.emit(vec![Change::Delete(token)]);
        Ok(())
    }

    /// Active item count.
    pub fn len(&self) -> usize {
        self.inner.borrow().tokens.len()
    }

    /// Returns true if no key is active.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().tokens.is_empty()
    }

    /// Returns true if the key is active.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.borrow().tokens.contains_key(key)
    }
}
