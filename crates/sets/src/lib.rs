//! Rill Sets - sources, bridges, operators and sinks for reactive sets.
//!
//! This crate builds the operator graph on top of the change-event algebra
//! in `rill-core`. Sources introduce lifetimes, operators translate upstream
//! lifetimes into downstream lifetimes without recomputing collections, and
//! sinks terminate a graph in a queryable view or a plain push-stream.
//!
//! # Core Concepts
//!
//! - `MutableSet`: an imperative keyed source with add/update/delete
//! - `constant`: a fixed set replayed to every subscriber
//! - Bridges: adapt foreign push-streams into reactive sets
//!   (`single_lifetime`, `multi_lifetime`, `from_snapshots`)
//! - Operators: `filter`, `map`, `join`, `left_join`, `group_by`,
//!   `flat_map_set`, `flat_map_array`
//! - Sinks: `materialize`, `snapshot_stream`, `count_stream`
//!
//! # Example
//!
//! ```ignore
//! use rill_sets::{MutableSet, SetExt};
//!
//! let orders = MutableSet::new(|order: &Order| order.id);
//! let large = orders.handle().filter(|order| order.total > 100);
//! let view = large.materialize(|order| order.id);
//!
//! orders.add(Order { id: 1, total: 250 })?;
//! assert_eq!(view.len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod bridge;
pub mod ext;
pub mod operators;
pub mod sink;
pub mod source;

pub use bridge::{from_snapshots, multi_lifetime, single_lifetime};
pub use ext::SetExt;
pub use operators::{filter, flat_map_array, flat_map_set, group_by, join, left_join, map};
pub use sink::{count_stream, materialize, snapshot_stream, MaterializedView};
pub use source::{constant, MutableSet};

// Re-export commonly used types from rill-core.
pub use rill_core::{
    Change, ChangeBatch, ChangeBatchExt, Error, Result, SetHandle, SetObserver, SharedObserver,
    Subscription, Token, ValueSource, ValueStream,
};
