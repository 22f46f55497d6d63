//! Change events for reactive sets.
//!
//! A `Change` describes one step in a lifetime: an Add begins it, Updates
//! replace the carried item, and a Delete ends it. Changes are delivered in
//! batches; a batch is produced atomically from one upstream notification.

use crate::token::Token;
use alloc::vec::Vec;

/// A single change to a reactive set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change<T> {
    /// The lifetime begins, carrying the item.
    Add(Token, T),
    /// The lifetime, already active, now carries the item.
    Update(Token, T),
    /// The lifetime ends.
    Delete(Token),
}

impl<T> Change<T> {
    /// Returns the lifetime token this change concerns.
    #[inline]
    pub fn token(&self) -> Token {
        match self {
            Change::Add(token, _) | Change::Update(token, _) | Change::Delete(token) => *token,
        }
    }

    /// Returns the carried item, if any (Add and Update).
    #[inline]
    pub fn value(&self) -> Option<&T> {
        match self {
            Change::Add(_, value) | Change::Update(_, value) => Some(value),
            Change::Delete(_) => None,
        }
    }

    /// Returns true if this is an Add.
    #[inline]
    pub fn is_add(&self) -> bool {
        matches!(self, Change::Add(..))
    }

    /// Returns true if this is an Update.
    #[inline]
    pub fn is_update(&self) -> bool {
        matches!(self, Change::Update(..))
    }

    /// Returns true if this is a Delete.
    #[inline]
    pub fn is_delete(&self) -> bool {
        matches!(self, Change::Delete(..))
    }

    /// Projects the carried item to a new type, preserving the token.
    ///
    /// Deletes pass through untouched.
    #[inline]
    pub fn map<U, F>(&self, f: F) -> Change<U>
    where
        F: FnOnce(&T) -> U,
    {
        match self {
            Change::Add(token, value) => Change::Add(*token, f(value)),
            Change::Update(token, value) => Change::Update(*token, f(value)),
            Change::Delete(token) => Change::Delete(*token),
        }
    }
}

/// A batch of changes, delivered as a single notification.
pub type ChangeBatch<T> = Vec<Change<T>>;

/// Extension trait for working with change batches.
pub trait ChangeBatchExt {
    /// Net membership delta: Adds minus Deletes. Updates do not count.
    fn net_count(&self) -> i64;

    /// Number of Adds in the batch.
    fn add_count(&self) -> usize;

    /// Number of Deletes in the batch.
    fn delete_count(&self) -> usize;
}

impl<T> ChangeBatchExt for [Change<T>] {
    fn net_count(&self) -> i64 {
        self.iter()
            .map(|c| match c {
                Change::Add(..) => 1,
                Change::Update(..) => 0,
                Change::Delete(..) => -1,
            })
            .sum()
    }

    fn add_count(&self) -> usize {
        self.iter().filter(|c| c.is_add()).count()
    }

    fn delete_count(&self) -> usize {
        self.iter().filter(|c| c.is_delete()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_change_accessors() {
        let token = Token::mint();
        let add = Change::Add(token, 42);
        assert!(add.is_add());
        assert_eq!(add.token(), token);
        assert_eq!(add.value(), Some(&42));

        let delete: Change<i32> = Change::Delete(token);
        assert!(delete.is_delete());
        assert_eq!(delete.value(), None);
    }

    #[test]
    fn test_change_map() {
        let token = Token::mint();
        let mapped = Change::Add(token, 21).map(|x| x * 2);
        assert_eq!(mapped, Change::Add(token, 42));

        let delete: Change<i32> = Change::Delete(token);
        assert_eq!(delete.map(|x| x * 2), Change::Delete(token));
    }

    #[test]
    fn test_batch_counts() {
        let a = Token::mint();
        let b = Token::mint();
        let batch: ChangeBatch<i32> = vec![
            Change::Add(a, 1),
            Change::Update(a, 2),
            Change::Add(b, 3),
            Change::Delete(a),
        ];
        assert_eq!(batch.net_count(), 1);
        assert_eq!(batch.add_count(), 2);
        assert_eq!(batch.delete_count(), 1);
    }
}
