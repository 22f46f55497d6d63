//! The inner join operator.
//!
//! State for incremental many-to-many joins: each side is indexed by token
//! and by key, and every matched pair owns a freshly minted downstream
//! token. Incoming batches from either side are translated into one
//! downstream batch.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver, Subscription, Token};

/// Token and key indexes for both sides of a join.
pub(crate) struct JoinSides<TL, TR, K> {
    left_by_token: HashMap<Token, (K, TL)>,
    right_by_token: HashMap<Token, (K, TR)>,
    left_by_key: HashMap<K, Vec<Token>>,
    right_by_key: HashMap<K, Vec<Token>>,
}

impl<TL, TR, K> JoinSides<TL, TR, K>
where
    TL: Clone,
    TR: Clone,
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            left_by_token: HashMap::new(),
            right_by_token: HashMap::new(),
            left_by_key: HashMap::new(),
            right_by_key: HashMap::new(),
        }
    }

    pub fn index_left(&mut self, token: Token, key: K, item: TL) {
        self.left_by_key.entry(key.clone()).or_default().push(token);
        self.left_by_token.insert(token, (key, item));
    }

    pub fn deindex_left(&mut self, token: Token) -> Option<(K, TL)> {
        let (key, item) = self.left_by_token.remove(&token)?;
        if let Some(bucket) = self.left_by_key.get_mut(&key) {
            bucket.retain(|t| *t != token);
            if bucket.is_empty() {
                self.left_by_key.remove(&key);
            }
        }
        Some((key, item))
    }

    pub fn set_left_item(&mut self, token: Token, item: TL) {
        if let Some((_, slot)) = self.left_by_token.get_mut(&token) {
            *slot = item;
        }
    }

    pub fn left_key(&self, token: Token) -> Option<K> {
        self.left_by_token.get(&token).map(|(key, _)| key.clone())
    }

    /// Lefts currently indexed under the key, with their items.
    pub fn lefts_for(&self, key: &K) -> Vec<(Token, TL)> {
        match self.left_by_key.get(key) {
            Some(bucket) => bucket
                .iter()
                .filter_map(|token| {
                    self.left_by_token
                        .get(token)
                        .map(|(_, item)| (*token, item.clone()))
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn index_right(&mut self, token: Token, key: K, item: TR) {
        self.right_by_key.entry(key.clone()).or_default().push(token);
        self.right_by_token.insert(token, (key, item));
    }

    pub fn deindex_right(&mut self, token: Token) -> Option<(K, TR)> {
        let (key, item) = self.right_by_token.remove(&token)?;
        if let Some(bucket) = self.right_by_key.get_mut(&key) {
            bucket.retain(|t| *t != token);
            if bucket.is_empty() {
                self.right_by_key.remove(&key);
            }
        }
        Some((key, item))
    }

    pub fn set_right_item(&mut self, token: Token, item: TR) {
        if let Some((_, slot)) = self.right_by_token.get_mut(&token) {
            *slot = item;
        }
    }

    pub fn right_key(&self, token: Token) -> Option<K> {
        self.right_by_token.get(&token).map(|(key, _)| key.clone())
    }

    /// Rights currently indexed under the key, with their items.
    pub fn rights_for(&self, key: &K) -> Vec<(Token, TR)> {
        match self.right_by_key.get(key) {
            Some(bucket) => bucket
                .iter()
                .filter_map(|token| {
                    self.right_by_token
                        .get(token)
                        .map(|(_, item)| (*token, item.clone()))
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn has_rights(&self, key: &K) -> bool {
        self.right_by_key.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.left_by_token.clear();
        self.right_by_token.clear();
        self.left_by_key.clear();
        self.right_by_key.clear();
    }
}

struct JoinCore<TL, TR, K, U> {
    sides: JoinSides<TL, TR, K>,
    pairs: HashMap<(Token, Token), Token>,
    left_key: Box<dyn Fn(&TL) -> K>,
    right_key: Box<dyn Fn(&TR) -> K>,
    project: Box<dyn Fn(&TL, &TR) -> U>,
    outlet: Outlet<U>,
    left_sub: Subscription,
    right_sub: Subscription,
}

impl<TL, TR, K, U> JoinCore<TL, TR, K, U>
where
    TL: Clone,
    TR: Clone,
    K: Eq + Hash + Clone,
    U: Clone + 'static,
{
    fn on_left_batch(&mut self, batch: &[Change<TL>]) {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(token, item) => {
                    let key = (self.left_key)(item);
                    self.sides.index_left(*token, key.clone(), item.clone());
                    for (right, right_item) in self.sides.rights_for(&key) {
                        let down = Token::mint();
                        self.pairs.insert((*token, right), down);
                        out.push(Change::Add(down, (self.project)(item, &right_item)));
                    }
                }
                Change::Update(token, item) => {
                    let old_key = self.sides.left_key(*token);
                    let new_key = (self.left_key)(item);
                    if old_key.as_ref() == Some(&new_key) {
                        self.sides.set_left_item(*token, item.clone());
                        for (right, right_item) in self.sides.rights_for(&new_key) {
                            if let Some(down) = self.pairs.get(&(*token, right)) {
                                out.push(Change::Update(*down, (self.project)(item, &right_item)));
                            }
                        }
                    } else {
                        if let Some((key, _)) = self.sides.deindex_left(*token) {
                            for (right, _) in self.sides.rights_for(&key) {
                                if let Some(down) = self.pairs.remove(&(*token, right)) {
                                    out.push(Change::Delete(down));
                                }
                            }
                        }
                        self.sides.index_left(*token, new_key.clone(), item.clone());
                        for (right, right_item) in self.sides.rights_for(&new_key) {
                            let down = Token::mint();
                            self.pairs.insert((*token, right), down);
                            out.push(Change::Add(down, (self.project)(item, &right_item)));
                        }
                    }
                }
                Change::Delete(token) => {
                    if let Some((key, _)) = self.sides.deindex_left(*token) {
                        for (right, _) in self.sides.rights_for(&key) {
                            if let Some(down) = self.pairs.remove(&(*token, right)) {
                                out.push(Change::Delete(down));
                            }
                        }
                    }
                }
            }
        }
        self.outlet.emit(out);
    }

    fn on_right_batch(&mut self, batch: &[Change<TR>]) {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(token, item) => {
                    let key = (self.right_key)(item);
                    self.sides.index_right(*token, key.clone(), item.clone());
                    for (left, left_item) in self.sides.lefts_for(&key) {
                        let down = Token::mint();
                        self.pairs.insert((left, *token), down);
                        out.push(Change::Add(down, (self.project)(&left_item, item)));
                    }
                }
                Change::Update(token, item) => {
                    let old_key = self.sides.right_key(*token);
                    let new_key = (self.right_key)(item);
                    if old_key.as_ref() == Some(&new_key) {
                        self.sides.set_right_item(*token, item.clone());
                        for (left, left_item) in self.sides.lefts_for(&new_key) {
                            if let Some(down) = self.pairs.get(&(left, *token)) {
                                out.push(Change::Update(*down, (self.project)(&left_item, item)));
                            }
                        }
                    } else {
                        if let Some((key, _)) = self.sides.deindex_right(*token) {
                            for (left, _) in self.sides.lefts_for(&key) {
                                if let Some(down) = self.pairs.remove(&(left, *token)) {
                                    out.push(Change::Delete(down));
                                }
                            }
                        }
                        self.sides.index_right(*token, new_key.clone(), item.clone());
                        for (left, left_item) in self.sides.lefts_for(&new_key) {
                            let down = Token::mint();
                            self.pairs.insert((left, *token), down);
                            out.push(Change::Add(down, (self.project)(&left_item, item)));
                        }
                    }
                }
                Change::Delete(token) => {
                    if let Some((key, _)) = self.sides.deindex_right(*token) {
                        for (left, _) in self.sides.lefts_for(&key) {
                            if let Some(down) = self.pairs.remove(&(left, *token)) {
                                out.push(Change::Delete(down));
                            }
                        }
                    }
                }
            }
        }
        self.outlet.emit(out);
    }

    fn fail(&mut self, error: Error) {
        self.left_sub.dispose();
        self.right_sub.dispose();
        self.sides.clear();
        self.pairs.clear();
        self.outlet.fail(error);
    }

    fn finish(&mut self) {
        self.left_sub.dispose();
        self.right_sub.dispose();
        self.sides.clear();
        self.pairs.clear();
        self.outlet.complete();
    }
}

struct JoinLeft<TL, TR, K, U> {
    core: Rc<RefCell<JoinCore<TL, TR, K, U>>>,
}

impl<TL, TR, K, U> SetObserver<TL> for JoinLeft<TL, TR, K, U>
where
    TL: Clone,
    TR: Clone,
    K: Eq + Hash + Clone,
    U: Clone + 'static,
{
    fn on_next(&mut self, batch: &[Change<TL>]) {
        self.core.borrow_mut().on_left_batch(batch);
    }

    fn on_error(&mut self, error: Error) {
        self.core.borrow_mut().fail(error);
    }

    fn on_completed(&mut self) {
        self.core.borrow_mut().finish();
    }
}

struct JoinRight<TL, TR, K, U> {
    core: Rc<RefCell<JoinCore<TL, TR, K, U>>>,
}

impl<TL, TR, K, U> SetObserver<TR> for JoinRight<TL, TR, K, U>
where
    TL: Clone,
    TR: Clone,
    K: Eq + Hash + Clone,
    U: Clone + 'static,
{
    fn on_next(&mut self, batch: &[Change<TR>]) {
        self.core.borrow_mut().on_right_batch(batch);
    }

    fn on_error(&mut self, error: Error) {
        self.core.borrow_mut().fail(error);
    }

    fn on_completed(&mut self) {
        self.core.borrow_mut().finish();
    }
}

/// Inner-joins two reactive sets on equal keys, projecting each matched
/// pair. Every pair owns a fresh downstream token, minted on match and
/// retired when either side leaves the match.
pub fn join<TL, TR, K, U>(
    left: &SetHandle<TL>,
    right: &SetHandle<TR>,
    left_key: impl Fn(&TL) -> K + 'static,
    right_key: impl Fn(&TR) -> K + 'static,
    project: impl Fn(&TL, &TR) -> U + 'static,
) -> SetHandle<U>
where
    TL: Clone + 'static,
    TR: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
    U: Clone + 'static,
{
    let outlet = Outlet::new();
    let core = Rc::new(RefCell::new(JoinCore {
        sides: JoinSides::new(),
        pairs: HashMap::new(),
        left_key: Box::new(left_key),
        right_key: Box::new(right_key),
        project: Box::new(project),
        outlet: outlet.clone(),
        left_sub: Subscription::empty(),
        right_sub: Subscription::empty(),
    }));

    let left_sub = left.subscribe(Rc::new(RefCell::new(JoinLeft { core: core.clone() })));
    core.borrow_mut().left_sub = left_sub;
    let right_sub = right.subscribe(Rc::new(RefCell::new(JoinRight { core: core.clone() })));
    core.borrow_mut().right_sub = right_sub;

    outlet.handle()
}
