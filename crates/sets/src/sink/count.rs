//! The count sink.

use alloc::rc::Rc;
use core::cell::RefCell;
use rill_core::{Change, ChangeBatchExt, Error, SetHandle, SetObserver, ValueStream};

struct CountSink {
    count: i64,
    output: ValueStream<i64>,
}

impl<T: Clone + 'static> SetObserver<T> for CountSink {
    fn on_next(&mut self, batch: &[Change<T>]) {
        self.count += batch.net_count();
        self.output.push(self.count);
    }

    fn on_error(&mut self, error: Error) {
        self.output.fail(error);
    }

    fn on_completed(&mut self) {
        self.output.complete();
    }
}

/// Collapses a reactive set into a push-stream of its membership count,
/// emitted once per upstream batch. Updates leave the count unchanged but
/// still produce an emission.
pub fn count_stream<T>(source: &SetHandle<T>) -> ValueStream<i64>
where
    T: Clone + 'static,
{
    let output = ValueStream::new();
    let _subscription = source.subscribe(Rc::new(RefCell::new(CountSink {
        count: 0,
        output: output.clone(),
    })));
    output
}
