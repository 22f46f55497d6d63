//! The left join operator.
//!
//! All of the inner join, plus one distinguished null-right lifetime per
//! unmatched left: a left with no matching right is still represented
//! downstream, projected against nothing. When the first matching right
//! arrives, the null-right downstream token is reassigned to the new pair -
//! an Update, not a Delete/Add - so the downstream identity survives the
//! transition. When a left loses its last right match, a fresh null-right
//! lifetime is minted.

use super::join::JoinSides;
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver, Subscription, Token};

struct LeftJoinCore<TL, TR, K, U> {
    sides: JoinSides<TL, TR, K>,
    pairs: HashMap<(Token, Token), Token>,
    null_right: HashMap<Token, Token>,
    left_key: Box<dyn Fn(&TL) -> K>,
    right_key: Box<dyn Fn(&TR) -> K>,
    project: Box<dyn Fn(&TL, Option<&TR>) -> U>,
    outlet: Outlet<U>,
    left_sub: Subscription,
    right_sub: Subscription,
}

impl<TL, TR, K, U> LeftJoinCore<TL, TR, K, U>
where
    TL: Clone,
    TR: Clone,
    K: Eq + Hash + Clone,
    U: Clone + 'static,
{
    fn admit_left(&mut self, token: Token, key: K, item: &TL, out: &mut ChangeBatch<U>) {
        self.sides.index_left(token, key.clone(), item.clone());
        let rights = self.sides.rights_for(&key);
        if rights.is_empty() {
            let down = Token::mint();
            self.null_right.insert(token, down);
            out.push(Change::Add(down, (self.project)(item, None)));
        } else {
            for (right, right_item) in rights {
                let down = Token::mint();
                self.pairs.insert((token, right), down);
                out.push(Change::Add(down, (self.project)(item, Some(&right_item))));
            }
        }
    }

    fn retire_left(&mut self, token: Token, out: &mut ChangeBatch<U>) {
        if let Some((key, _)) = self.sides.deindex_left(token) {
            for (right, _) in self.sides.rights_for(&key) {
                if let Some(down) = self.pairs.remove(&(token, right)) {
                    out.push(Change::Delete(down));
                }
            }
            if let Some(down) = self.null_right.remove(&token) {
                out.push(Change::Delete(down));
            }
        }
    }

    fn admit_right(&mut self, token: Token, key: K, item: &TR, out: &mut ChangeBatch<U>) {
        self.sides.index_right(token, key.clone(), item.clone());
        for (left, left_item) in self.sides.lefts_for(&key) {
            match self.null_right.remove(&left) {
                // Reassign the null-right downstream token to the first
                // matching pair, keeping the downstream identity.
                Some(down) => {
                    self.pairs.insert((left, token), down);
                    out.push(Change::Update(down, (self.project)(&left_item, Some(item))));
                }
                None => {
                    let down = Token::mint();
                    self.pairs.insert((left, token), down);
                    out.push(Change::Add(down, (self.project)(&left_item, Some(item))));
                }
            }
        }
    }

    fn retire_right(&mut self, token: Token, out: &mut ChangeBatch<U>) {
        if let Some((key, _)) = self.sides.deindex_right(token) {
            let still_matched = self.sides.has_rights(&key);
            for (left, left_item) in self.sides.lefts_for(&key) {
                if let Some(down) = self.pairs.remove(&(left, token)) {
                    out.push(Change::Delete(down));
                }
                if !still_matched {
                    let down = Token::mint();
                    self.null_right.insert(left, down);
                    out.push(Change::Add(down, (self.project)(&left_item, None)));
                }
            }
        }
    }

    fn on_left_batch(&mut self, batch: &[Change<TL>]) {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(token, item) => {
                    let key = (self.left_key)(item);
                    self.admit_left(*token, key, item, &mut out);
                }
                Change::Update(token, item) => {
                    let old_key = self.sides.left_key(*token);
                    let new_key = (self.left_key)(item);
                    if old_key.as_ref() == Some(&new_key) {
                        self.sides.set_left_item(*token, item.clone());
                        if let Some(down) = self.null_right.get(token) {
                            out.push(Change::Update(*down, (self.project)(item, None)));
                        } else {
                            for (right, right_item) in self.sides.rights_for(&new_key) {
                                if let Some(down) = self.pairs.get(&(*token, right)) {
                                    out.push(Change::Update(
                                        *down,
                                        (self.project)(item, Some(&right_item)),
                                    ));
                                }
                            }
                        }
                    } else {
                        self.retire_left(*token, &mut out);
                        self.admit_left(*token, new_key, item, &mut out);
                    }
                }
                Change::Delete(token) => {
                    self.retire_left(*token, &mut out);
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
                    self.admit_right(*token, key, item, &mut out);
                }
                Change::Update(token, item) => {
                    let old_key = self.sides.right_key(*token);
                    let new_key = (self.right_key)(item);
                    if old_key.as_ref() == Some(&new_key) {
                        self.sides.set_right_item(*token, item.clone());
                        for (left, left_item) in self.sides.lefts_for(&new_key) {
                            if let Some(down) = self.pairs.get(&(left, *token)) {
                                out.push(Change::Update(
                                    *down,
                                    (self.project)(&left_item, Some(item)),
                                ));
                            }
                        }
                    } else {
                        // Old pairs go first, restoring null-rights where a
                        // left lost its last match, then the new key's
                        // matches form.
                        self.retire_right(*token, &mut out);
                        self.admit_right(*token, new_key, item, &mut out);
                    }
                }
                Change::Delete(token) => {
                    self.retire_right(*token, &mut out);
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
        self.null_right.clear();
        self.outlet.fail(error);
    }

    fn finish(&mut self) {
        self.left_sub.dispose();
        self.right_sub.dispose();
        self.sides.clear();
        self.pairs.clear();
        self.null_right.clear();
        self.outlet.complete();
    }
}

struct LeftJoinLeft<TL, TR, K, U> {
    core: Rc<RefCell<LeftJoinCore<TL, TR, K, U>>>,
}

impl<TL, TR, K, U> SetObserver<TL> for LeftJoinLeft<TL, TR, K, U>
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

struct LeftJoinRight<TL, TR, K, U> {
    core: Rc<RefCell<LeftJoinCore<TL, TR, K, U>>>,
}

impl<TL, TR, K, U> SetObserver<TR> for LeftJoinRight<TL, TR, K, U>
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

/// Left-joins two reactive sets on equal keys.
///
/// Every active left lifetime has exactly one downstream representation at
/// any point: one pair per matching right, or a single null-right
/// projection when no right matches.
pub fn left_join<TL, TR, K, U>(
    left: &SetHandle<TL>,
    right: &SetHandle<TR>,
    left_key: impl Fn(&TL) -> K + 'static,
    right_key: impl Fn(&TR) -> K + 'static,
    project: impl Fn(&TL, Option<&TR>) -> U + 'static,
) -> SetHandle<U>
where
    TL: Clone + 'static,
    TR: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
    U: Clone + 'static,
{
    let outlet = Outlet::new();
    let core = Rc::new(RefCell::new(LeftJoinCore {
        sides: JoinSides::new(),
        pairs: HashMap::new(),
        null_right: HashMap::new(),
        left_key: Box::new(left_key),
        right_key: Box::new(right_key),
        project: Box::new(project),
        outlet: outlet.clone(),
        left_sub: Subscription::empty(),
        right_sub: Subscription::empty(),
    }));

    let left_sub = left.subscribe(Rc::new(RefCell::new(LeftJoinLeft { core: core.clone() })));
    core.borrow_mut().left_sub = left_sub;
    let right_sub = right.subscribe(Rc::new(RefCell::new(LeftJoinRight { core: core.clone() })));
    core.borrow_mut().right_sub = right_sub;

    outlet.handle()
}
