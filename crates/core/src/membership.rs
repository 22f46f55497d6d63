//! Replay membership.
//!
//! Every node keeps a `Membership`: the token-to-item map reconstructed from
//! the batches it has emitted. It serves two jobs: producing the replay
//! batch a new subscriber receives, and validating that emitted batches obey
//! the lifetime algebra.

use crate::change::{Change, ChangeBatch};
use crate::error::{Error, Result};
use crate::token::Token;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// The set of currently active lifetimes and their carried items.
#[derive(Clone, Debug, Default)]
pub struct Membership<T> {
    items: HashMap<Token, T>,
}

impl<T: Clone> Membership<T> {
    /// Creates an empty membership.
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Applies a batch, validating the lifetime algebra.
    ///
    /// An Add for a live token, or an Update/Delete for a token that is not
    /// live, is a producer bug and yields `InvalidPrecondition`.
    pub fn apply(&mut self, batch: &[Change<T>]) -> Result<()> {
        for change in batch {
            match change {
                Change::Add(token, value) => {
                    if self.items.insert(*token, value.clone()).is_some() {
                        return Err(Error::invalid_precondition("add on a live token"));
                    }
                }
                Change::Update(token, value) => match self.items.get_mut(token) {
                    Some(slot) => *slot = value.clone(),
                    None => {
                        return Err(Error::invalid_precondition("update without a prior add"));
                    }
                },
                Change::Delete(token) => {
                    if self.items.remove(token).is_none() {
                        return Err(Error::invalid_precondition("delete without a prior add"));
                    }
                }
            }
        }
        Ok(())
    }

    /// The replay batch: one Add per active lifetime.
    pub fn replay(&self) -> ChangeBatch<T> {
        self.items
            .iter()
            .map(|(token, item)| Change::Add(*token, item.clone()))
            .collect()
    }

    /// Drains every active lifetime into a final Delete batch.
    pub fn drain_to_deletes(&mut self) -> ChangeBatch<T> {
        self.items
            .drain()
            .map(|(token, _)| Change::Delete(token))
            .collect()
    }

    /// Returns the item carried by a live token.
    #[inline]
    pub fn get(&self, token: Token) -> Option<&T> {
        self.items.get(&token)
    }

    /// Returns true if the token is live.
    #[inline]
    pub fn contains(&self, token: Token) -> bool {
        self.items.contains_key(&token)
    }

    /// Active lifetime count.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no lifetime is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The active tokens, in no particular order.
    pub fn tokens(&self) -> Vec<Token> {
        self.items.keys().copied().collect()
    }

    /// The carried items, in no particular order.
    pub fn values(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }
}
