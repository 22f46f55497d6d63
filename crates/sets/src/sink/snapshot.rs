//! The snapshot sink.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use rill_core::{Change, Error, SetHandle, SetObserver, Token, ValueStream};

struct SnapshotSink<T> {
    items: HashMap<Token, T>,
    output: ValueStream<Vec<T>>,
}

impl<T: Clone + 'static> SetObserver<T> for SnapshotSink<T> {
    fn on_next(&mut self, batch: &[Change<T>]) {
        for change in batch {
            match change {
                Change::Add(token, item) | Change::Update(token, item) => {
                    self.items.insert(*token, item.clone());
                }
                Change::Delete(token) => {
                    self.items.remove(token);
                }
            }
        }
        self.output.push(self.items.values().cloned().collect());
    }

    fn on_error(&mut self, error: Error) {
        self.items.clear();
        self.output.fail(error);
    }

    fn on_completed(&mut self) {
        self.items.clear();
        self.output.complete();
    }
}

/// Collapses a reactive set into a push-stream of full value collections,
/// one snapshot per upstream batch.
pub fn snapshot_stream<T>(source: &SetHandle<T>) -> ValueStream<Vec<T>>
where
    T: Clone + 'static,
{
    let output = ValueStream::new();
    let _subscription = source.subscribe(Rc::new(RefCell::new(SnapshotSink {
        items: HashMap::new(),
        output: output.clone(),
    })));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MutableSet;
    use rill_core::stream::{observer_from_fn, ValueSource};

    #[test]
    fn test_one_snapshot_per_batch() {
        let source: MutableSet<i32, i32> = MutableSet::new(|x: &i32| *x % 10);
        let snapshots = snapshot_stream(&source.handle());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        snapshots.subscribe(observer_from_fn(move |snapshot: &Vec<i32>| {
            let mut snapshot = snapshot.clone();
            snapshot.sort_unstable();
            seen_clone.borrow_mut().push(snapshot);
        }));

        source.add(1).unwrap();
        source.add(2).unwrap();
        source.update(12).unwrap();
        source.delete(&1).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], alloc::vec![1]);
        assert_eq!(seen[1], alloc::vec![1, 2]);
        assert_eq!(seen[2], alloc::vec![1, 12]);
        assert_eq!(seen[3], alloc::vec![12]);
    }
}
