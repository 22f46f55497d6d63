//! The filter operator.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use hashbrown::HashSet;
use rill_core::{Change, ChangeBatch, Error, Outlet, SetHandle, SetObserver, Token};

struct Filter<T> {
    predicate: Box<dyn Fn(&T) -> bool>,
    admitted: HashSet<Token>,
    outlet: Outlet<T>,
}

impl<T: Clone + 'static> SetObserver<T> for Filter<T> {
    fn on_next(&mut self, batch: &[Change<T>]) {
        let mut out = ChangeBatch::new();
        for change in batch {
            match change {
                Change::Add(token, value) => {
                    if (self.predicate)(value) {
                        self.admitted.insert(*token);
                        out.push(Change::Add(*token, value.clone()));
                    }
                }
                Change::Update(token, value) => {
                    let admitted = self.admitted.contains(token);
                    let passes = (self.predicate)(value);
                    match (admitted, passes) {
                        (true, true) => out.push(Change::Update(*token, value.clone())),
                        (true, false) => {
                            self.admitted.remove(token);
                            out.push(Change::Delete(*token));
                        }
                        (false, true) => {
                            self.admitted.insert(*token);
                            out.push(Change::Add(*token, value.clone()));
                        }
                        (false, false) => {}
                    }
                }
                Change::Delete(token) => {
                    if self.admitted.remove(token) {
                        out.push(Change::Delete(*token));
                    }
                }
            }
        }
        self.outlet.emit(out);
    }

    fn on_error(&mut self, error: Error) {
        self.admitted.clear();
        self.outlet.fail(error);
    }

    fn on_completed(&mut self) {
        self.admitted.clear();
        self.outlet.complete();
    }
}

/// Filters a reactive set by a predicate over the carried item.
///
/// Admission is re-evaluated on every Update: a member whose update stops
/// passing is Deleted downstream, and one whose update starts passing is
/// Added. Admitted lifetimes keep their upstream tokens.
pub fn filter<T>(source: &SetHandle<T>, predicate: impl Fn(&T) -> bool + 'static) -> SetHandle<T>
where
    T: Clone + 'static,
{
    let outlet = Outlet::new();
    let observer = Rc::new(RefCell::new(Filter {
        predicate: Box::new(predicate),
        admitted: HashSet::new(),
        outlet: outlet.clone(),
    }));
    let _subscription = source.subscribe(observer);
    outlet.handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MutableSet;
    use alloc::vec::Vec;
    use rill_core::observer::from_fn;

    fn evens() -> (MutableSet<i32, i32>, Rc<RefCell<Vec<ChangeBatch<i32>>>>) {
        let source = MutableSet::new(|x: &i32| *x / 10);
        let filtered = filter(&source.handle(), |x| x % 2 == 0);
        let batches = Rc::new(RefCell::new(Vec::new()));
        let batches_clone = batches.clone();
        filtered.subscribe(from_fn(move |batch: &[Change<i32>]| {
            batches_clone.borrow_mut().push(batch.to_vec());
        }));
        (source, batches)
    }

    #[test]
    fn test_rejected_add_emits_nothing() {
        let (source, batches) = evens();
        source.add(11).unwrap();
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_update_crossing_the_predicate() {
        let (source, batches) = evens();
        source.add(11).unwrap();
        source.update(12).unwrap();
        source.update(14).unwrap();
        source.update(13).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 3);
        assert!(batches[0][0].is_add());
        assert!(batches[1][0].is_update());
        assert!(batches[2][0].is_delete());
        assert_eq!(batches[0][0].token(), batches[2][0].token());
    }

    #[test]
    fn test_delete_of_unadmitted_emits_nothing() {
        let (source, batches) = evens();
        source.add(11).unwrap();
        source.delete(&1).unwrap();
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_replay_through_filter() {
        let source: MutableSet<i32, i32> = MutableSet::new(|x: &i32| *x);
        source.add(1).unwrap();
        source.add(2).unwrap();
        let filtered = filter(&source.handle(), |x| x % 2 == 0);

        let replay = Rc::new(RefCell::new(Vec::new()));
        let replay_clone = replay.clone();
        filtered.subscribe(from_fn(move |batch: &[Change<i32>]| {
            replay_clone.borrow_mut().push(batch.to_vec());
        }));

        assert_eq!(replay.borrow().len(), 1);
        assert_eq!(replay.borrow()[0].len(), 1);
        assert_eq!(replay.borrow()[0][0].value(), Some(&2));
    }
}
