//! Rill Pipeline - dedicated-thread execution for reactive-set graphs.
//!
//! A reactive-set graph is single-threaded by construction (`Rc`/`RefCell`
//! state, synchronous push). This crate gives such a graph a home: a
//! `Pipeline` owns one dedicated thread, the graph is built on that thread,
//! and mutations from other threads are dispatched to it over a job channel
//! with the caller blocked until the batch has fully propagated. Concurrent
//! callers serialize on the channel, so at most one batch is in flight.
//!
//! Values that must stay on the pipeline thread (sources, materialized
//! views) are parked in a pipeline-resident registry via
//! [`PipelineScope::anchor`]; the returned [`Anchor`] is a `Send + Clone`
//! handle whose `with` runs a closure against the value on the pipeline
//! thread - inline when the caller already is that thread.
//!
//! # Example
//!
//! ```ignore
//! let (pipeline, (orders, view)) = Pipeline::spawn(|scope| {
//!     let orders = MutableSet::new(|o: &Order| o.id);
//!     let view = orders.handle().filter(|o| o.total > 100).materialize(|o| o.id);
//!     (scope.portal(&orders), scope.anchor(view))
//! });
//!
//! // From any thread; returns once downstream state reflects the add.
//! orders.add(Order { id: 1, total: 250 })?;
//! assert_eq!(view.with(|v| v.len()), 1);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};
use tracing::{debug, trace};

use rill_core::Result;
use rill_sets::MutableSet;

static NEXT_PIPELINE: AtomicU64 = AtomicU64::new(1);

type Job = Box<dyn FnOnce(&Registry) + Send>;

enum Command {
    Invoke(Job),
    Shutdown,
}

/// Pipeline-resident values, owned by the pipeline thread.
struct Registry {
    slots: HashMap<u64, Box<dyn Any>>,
}

impl Registry {
    fn value<V: 'static>(&self, slot: u64) -> &V {
        self.slots
            .get(&slot)
            .and_then(|boxed| boxed.downcast_ref())
            .expect("anchor does not refer to a value on this pipeline")
    }
}

thread_local! {
    /// Set while a pipeline thread is serving its graph, so dispatch from
    /// that thread (a mutation made inside a subscriber callback) runs
    /// inline instead of deadlocking on its own job channel.
    static CURRENT: RefCell<Option<(u64, Rc<Registry>)>> = const { RefCell::new(None) };
}

/// Builder-side access to the pipeline under construction.
pub struct PipelineScope {
    slots: HashMap<u64, Box<dyn Any>>,
    next_slot: u64,
    pipeline_id: u64,
    sender: Sender<Command>,
}

impl PipelineScope {
    /// Parks a value in the pipeline-resident registry, returning a `Send`
    /// handle that runs closures against it on the pipeline thread.
    pub fn anchor<V: 'static>(&mut self, value: V) -> Anchor<V> {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.slots.insert(slot, Box::new(value));
        Anchor {
            slot,
            pipeline_id: self.pipeline_id,
            sender: self.sender.clone(),
            _marker: PhantomData,
        }
    }

    /// Anchors a mutable set and wraps it in a mutation portal.
    pub fn portal<T, K>(&mut self, source: &MutableSet<T, K>) -> SourcePortal<T, K>
    where
        T: Clone + Send + 'static,
        K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    {
        SourcePortal {
            anchor: self.anchor(source.clone()),
        }
    }
}

/// A `Send + Clone` handle to a pipeline-resident value.
pub struct Anchor<V> {
    slot: u64,
    pipeline_id: u64,
    sender: Sender<Command>,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for Anchor<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            pipeline_id: self.pipeline_id,
            sender: self.sender.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V: 'static> Anchor<V> {
    /// Runs the closure against the anchored value on the pipeline thread.
    ///
    /// From the pipeline thread itself the closure runs inline; from any
    /// other thread it is dispatched and the caller blocks until it has
    /// run, so all downstream state reflects the call when it returns.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline has been shut down.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&V) -> R + Send + 'static,
        R: Send + 'static,
    {
        let inline = CURRENT.with(|current| match &*current.borrow() {
            Some((id, registry)) if *id == self.pipeline_id => Some(registry.clone()),
            _ => None,
        });
        if let Some(registry) = inline {
            return f(registry.value::<V>(self.slot));
        }

        let (reply_tx, reply_rx) = bounded(1);
        let slot = self.slot;
        let job: Job = Box::new(move |registry| {
            let result = f(registry.value::<V>(slot));
            let _ = reply_tx.send(result);
        });
        self.sender
            .send(Command::Invoke(job))
            .expect("pipeline has been shut down");
        reply_rx
            .recv()
            .expect("pipeline dropped the dispatched call")
    }
}

/// A `Send` mutation handle for an anchored mutable set.
pub struct SourcePortal<T, K> {
    anchor: Anchor<MutableSet<T, K>>,
}

impl<T, K> Clone for SourcePortal<T, K> {
    fn clone(&self) -> Self {
        Self {
            anchor: self.anchor.clone(),
        }
    }
}

impl<T, K> SourcePortal<T, K>
where
    T: Clone + Send + 'static,
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
{
    /// Adds an item; returns once the batch has fully propagated.
    pub fn add(&self, item: T) -> Result<()> {
        self.anchor.with(move |source| source.add(item))
    }

    /// Updates an item; returns once the batch has fully propagated.
    pub fn update(&self, item: T) -> Result<()> {
        self.anchor.with(move |source| source.update(item))
    }

    /// Deletes by key; returns once the batch has fully propagated.
    pub fn delete(&self, key: K) -> Result<()> {
        self.anchor.with(move |source| source.delete(&key))
    }

    /// Active item count, read on the pipeline thread.
    pub fn len(&self) -> usize {
        self.anchor.with(|source| source.len())
    }

    /// Returns true if no key is active.
    pub fn is_empty(&self) -> bool {
        self.anchor.with(|source| source.is_empty())
    }

    /// Returns true if the key is active.
    pub fn contains_key(&self, key: K) -> bool {
        self.anchor.with(move |source| source.contains_key(&key))
    }
}

/// One reactive-set graph and the thread that owns it.
pub struct Pipeline {
    sender: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    id: u64,
}

impl Pipeline {
    /// Spawns a pipeline thread, runs `build` on it to construct the graph,
    /// and returns the pipeline together with the builder's exports.
    ///
    /// The graph itself is not `Send` and never leaves the thread; exports
    /// are the `Send` handles (`Anchor`, `SourcePortal`) the builder hands
    /// back.
    pub fn spawn<F, E>(build: F) -> (Pipeline, E)
    where
        F: FnOnce(&mut PipelineScope) -> E + Send + 'static,
        E: Send + 'static,
    {
        let (sender, receiver) = unbounded::<Command>();
        let (export_tx, export_rx) = bounded(1);
        let id = NEXT_PIPELINE.fetch_add(1, Ordering::Relaxed);

        let scope_sender = sender.clone();
        let worker = thread::Builder::new()
            .name(format!("rill-pipeline-{id}"))
            .spawn(move || {
                let mut scope = PipelineScope {
                    slots: HashMap::new(),
                    next_slot: 1,
                    pipeline_id: id,
                    sender: scope_sender,
                };
                let exports = build(&mut scope);
                let registry = Rc::new(Registry { slots: scope.slots });
                CURRENT.with(|current| {
                    *current.borrow_mut() = Some((id, registry.clone()));
                });
                debug!(pipeline = id, "pipeline thread running");
                if export_tx.send(exports).is_err() {
                    return;
                }
                while let Ok(command) = receiver.recv() {
                    match command {
                        Command::Invoke(job) => {
                            trace!(pipeline = id, "dispatching job");
                            job(&registry);
                        }
                        Command::Shutdown => break,
                    }
                }
                CURRENT.with(|current| {
                    *current.borrow_mut() = None;
                });
                debug!(pipeline = id, "pipeline thread stopped");
            })
            .expect("failed to spawn pipeline thread");

        let exports = export_rx.recv().expect("pipeline builder panicked");
        (
            Pipeline {
                sender,
                worker: Some(worker),
                id,
            },
            exports,
        )
    }

    /// The pipeline's identity, unique within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops the pipeline thread after draining already-queued jobs.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.sender.send(Command::Shutdown);
            let _ = worker.join();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
