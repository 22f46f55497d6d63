//! Bridge from a stream of full snapshots to a reactive set.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;
use rill_core::stream::{ValueObserver, ValueSource};
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, Token};

struct SnapshotDiff<T, K> {
    key_fn: Box<dyn Fn(&T) -> K>,
    previous: HashMap<K, (Token, T)>,
    outlet: Outlet<T>,
}

impl<T, K> ValueObserver<Vec<T>> for SnapshotDiff<T, K>
where
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + 'static,
{
    fn on_next(&mut self, snapshot: &Vec<T>) {
        // Late duplicates overwrite earlier ones.
        let mut next: HashMap<K, T> = HashMap::with_capacity(snapshot.len());
        for item in snapshot {
            next.insert((self.key_fn)(item), item.clone());
        }

        let mut batch = ChangeBatch::new();
        for (key, (token, _)) in &self.previous {
            if !next.contains_key(key) {
                batch.push(Change::Delete(*token));
            }
        }

        let mut fresh: HashMap<K, (Token, T)> = HashMap::with_capacity(next.len());
        for (key, item) in next {
            match self.previous.get(&key) {
                Some((token, old)) => {
                    if *old != item {
                        batch.push(Change::Update(*token, item.clone()));
                    }
                    fresh.insert(key, (*token, item));
                }
                None => {
                    let token = Token::mint();
                    batch.push(Change::Add(token, item.clone()));
                    fresh.insert(key, (token, item));
                }
            }
        }

        self.previous = fresh;
        self.outlet.emit(batch);
    }

    fn on_error(&mut self, error: Error) {
        self.previous.clear();
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        // Every lifetime ends; the downstream set stays open.
        let batch: ChangeBatch<T> = self
            .previous
            .drain()
            .map(|(_, (token, _))| Change::Delete(token))
            .collect();
        self.outlet.emit(batch);
    }
}

/// Adapts a push-stream of full collection snapshots into a reactive set by
/// diffing consecutive snapshots under `key_fn`: vanished keys Delete,
/// value changes Update under the preserved token, new keys Add. An
/// unchanged snapshot emits nothing.
pub fn from_snapshots<T, K, S>(source: &S, key_fn: impl Fn(&T) -> K + 'static) -> SetHandle<T>
where
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + 'static,
    S: ValueSource<Vec<T>>,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(SnapshotDiff {
        key_fn: Box::new(key_fn),
        previous: HashMap::new(),
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use rill_core::observer::from_fn;
    use rill_core::{ChangeBatchExt, ValueStream};

    #[derive(Clone, Debug, PartialEq)]
    struct Person {
        id: u32,
        name: String,
    }

    fn person(id: u32, name: &str) -> Person {
        Person {
            id,
            name: name.into(),
        }
    }

    fn record(set: &SetHandle<Person>) -> Rc<RefCell<Vec<ChangeBatch<Person>>>> {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let batches_clone = batches.clone();
        set.subscribe(from_fn(move |batch: &[Change<Person>]| {
            batches_clone.borrow_mut().push(batch.to_vec());
        }));
        batches
    }

    #[test]
    fn test_first_snapshot_is_all_adds() {
        let stream: ValueStream<Vec<Person>> = ValueStream::new();
        let set = from_snapshots(&stream, |p: &Person| p.id);
        let batches = record(&set);

        stream.push(vec![person(1, "Alice"), person(2, "Bob")]);

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].add_count(), 2);
    }

    #[test]
    fn test_unchanged_snapshot_emits_nothing() {
        let stream: ValueStream<Vec<Person>> = ValueStream::new();
        let set = from_snapshots(&stream, |p: &Person| p.id);
        let batches = record(&set);

        stream.push(vec![person(1, "Alice")]);
        stream.push(vec![person(1, "Alice")]);

        assert_eq!(batches.borrow().len(), 1);
    }

    #[test]
    fn test_diff_preserves_tokens_on_update() {
        let stream: ValueStream<Vec<Person>> = ValueStream::new();
        let set = from_snapshots(&stream, |p: &Person| p.id);
        let batches = record(&set);

        stream.push(vec![person(1, "Alice")]);
        stream.push(vec![person(1, "Alicia")]);

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert!(batches[1][0].is_update());
        assert_eq!(batches[0][0].token(), batches[1][0].token());
    }

    #[test]
    fn test_diff_mixes_adds_updates_deletes() {
        let stream: ValueStream<Vec<Person>> = ValueStream::new();
        let set = from_snapshots(&stream, |p: &Person| p.id);
        let batches = record(&set);

        stream.push(vec![person(1, "Alice"), person(2, "Bob")]);
        stream.push(vec![person(2, "Bobby"), person(3, "Cleo")]);

        let batches = batches.borrow();
        let second = &batches[1];
        assert_eq!(second.delete_count(), 1);
        assert_eq!(second.add_count(), 1);
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn test_late_duplicates_overwrite() {
        let stream: ValueStream<Vec<Person>> = ValueStream::new();
        let set = from_snapshots(&stream, |p: &Person| p.id);
        let batches = record(&set);

        stream.push(vec![person(1, "Alice"), person(1, "Alicia")]);

        let batches = batches.borrow();
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].value(), Some(&person(1, "Alicia")));
    }

    #[test]
    fn test_completion_drains_and_stays_open() {
        let stream: ValueStream<Vec<Person>> = ValueStream::new();
        let set = from_snapshots(&stream, |p: &Person| p.id);
        let batches = record(&set);

        stream.push(vec![person(1, "Alice")]);
        stream.complete();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].delete_count(), 1);

        let count = Rc::new(RefCell::new(0));
        let count_clone = count.clone();
        set.subscribe(from_fn(move |_batch: &[Change<Person>]| {
            *count_clone.borrow_mut() += 1;
        }));
        assert_eq!(*count.borrow(), 0);
    }
}
