//! Fluent combinators on reactive-set handles.

use crate::operators;
use crate::sink::{self, MaterializedView};
use alloc::vec::Vec;
use core::hash::Hash;
use rill_core::{SetHandle, ValueStream};

/// Extension methods building the operator graph off a handle.
///
/// Each method delegates to the free function of the same name; the graph
/// is built synchronously and runs push-driven afterwards.
pub trait SetExt<T: Clone + 'static> {
    /// See [`operators::map`].
    fn map<U>(&self, project: impl Fn(&T) -> U + 'static) -> SetHandle<U>
    where
        U: Clone + 'static;

    /// See [`operators::filter`].
    fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> SetHandle<T>;

    /// See [`operators::group_by`].
    fn group_by<K>(&self, key_fn: impl Fn(&T) -> K + 'static) -> SetHandle<SetHandle<T>>
    where
        K: Eq + Hash + Clone + 'static;

    /// See [`operators::flat_map_set`].
    fn flat_map_set<U>(&self, project: impl Fn(&T) -> SetHandle<U> + 'static) -> SetHandle<U>
    where
        U: Clone + PartialEq + 'static;

    /// See [`operators::flat_map_array`].
    fn flat_map_array<U, KU>(
        &self,
        project: impl Fn(&T) -> Vec<U> + 'static,
        child_key: impl Fn(&U) -> KU + 'static,
    ) -> SetHandle<U>
    where
        U: Clone + PartialEq + 'static,
        KU: Eq + Hash + Clone + 'static;

    /// See [`operators::join`].
    fn join<TR, K, U>(
        &self,
        right: &SetHandle<TR>,
        left_key: impl Fn(&T) -> K + 'static,
        right_key: impl Fn(&TR) -> K + 'static,
        project: impl Fn(&T, &TR) -> U + 'static,
    ) -> SetHandle<U>
    where
        TR: Clone + 'static,
        K: Eq + Hash + Clone + 'static,
        U: Clone + 'static;

    /// See [`operators::left_join`].
    fn left_join<TR, K, U>(
        &self,
        right: &SetHandle<TR>,
        left_key: impl Fn(&T) -> K + 'static,
        right_key: impl Fn(&TR) -> K + 'static,
        project: impl Fn(&T, Option<&TR>) -> U + 'static,
    ) -> SetHandle<U>
    where
        TR: Clone + 'static,
        K: Eq + Hash + Clone + 'static,
        U: Clone + 'static;

    /// See [`sink::materialize`].
    fn materialize<K>(&self, key_fn: impl Fn(&T) -> K + 'static) -> MaterializedView<T, K>
    where
        K: Eq + Hash + Clone + 'static;

    /// See [`sink::snapshot_stream`].
    fn snapshot_stream(&self) -> ValueStream<Vec<T>>;

    /// See [`sink::count_stream`].
    fn count_stream(&self) -> ValueStream<i64>;
}

impl<T: Clone + 'static> SetExt<T> for SetHandle<T> {
    fn map<U>(&self, project: impl Fn(&T) -> U + 'static) -> SetHandle<U>
    where
        U: Clone + 'static,
    {
        operators::map(self, project)
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> SetHandle<T> {
        operators::filter(self, predicate)
    }

    fn group_by<K>(&self, key_fn: impl Fn(&T) -> K + 'static) -> SetHandle<SetHandle<T>>
    where
        K: Eq + Hash + Clone + 'static,
    {
        operators::group_by(self, key_fn)
    }

    fn flat_map_set<U>(&self, project: impl Fn(&T) -> SetHandle<U> + 'static) -> SetHandle<U>
    where
        U: Clone + PartialEq + 'static,
    {
        operators::flat_map_set(self, project)
    }

    fn flat_map_array<U, KU>(
        &self,
        project: impl Fn(&T) -> Vec<U> + 'static,
        child_key: impl Fn(&U) -> KU + 'static,
    ) -> SetHandle<U>
    where
        U: Clone + PartialEq + 'static,
        KU: Eq + Hash + Clone + 'static,
    {
        operators::flat_map_array(self, project, child_key)
    }

    fn join<TR, K, U>(
        &self,
        right: &SetHandle<TR>,
        left_key: impl Fn(&T) -> K + 'static,
        right_key: impl Fn(&TR) -> K + 'static,
        project: impl Fn(&T, &TR) -> U + 'static,
    ) -> SetHandle<U>
    where
        TR: Clone + 'static,
        K: Eq + Hash + Clone + 'static,
        U: Clone + 'static,
    {
        operators::join(self, right, left_key, right_key, project)
    }

    fn left_join<TR, K, U>(
        &self,
        right: &SetHandle<TR>,
        left_key: impl Fn(&T) -> K + 'static,
        right_key: impl Fn(&TR) -> K + 'static,
        project: impl Fn(&T, Option<&TR>) -> U + 'static,
    ) -> SetHandle<U>
    where
        TR: Clone + 'static,
        K: Eq + Hash + Clone + 'static,
        U: Clone + 'static,
    {
        operators::left_join(self, right, left_key, right_key, project)
    }

    fn materialize<K>(&self, key_fn: impl Fn(&T) -> K + 'static) -> MaterializedView<T, K>
    where
        K: Eq + Hash + Clone + 'static,
    {
        sink::materialize(self, key_fn)
    }

    fn snapshot_stream(&self) -> ValueStream<Vec<T>> {
        sink::snapshot_stream(self)
    }

    fn count_stream(&self) -> ValueStream<i64> {
        sink::count_stream(self)
    }
}
