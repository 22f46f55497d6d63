//! Rill Core - change-event algebra and observable plumbing for reactive sets.
//!
//! A reactive set is a collection whose membership evolves over time. Instead
//! of re-emitting whole collections, producers emit batches of per-item
//! change events, each carried by an opaque lifetime token:
//!
//! - `Add(token, item)`: the lifetime begins carrying the item
//! - `Update(token, item)`: the lifetime now carries a new item
//! - `Delete(token)`: the lifetime ends
//!
//! # Core Concepts
//!
//! - `Token`: an opaque per-lifetime identity, compared only by identity
//! - `Change<T>` / `ChangeBatch<T>`: the event algebra every operator speaks
//! - `Outlet<T>`: the downstream half of a node - subscriber registry,
//!   replay membership, and terminal state
//! - `SetHandle<T>`: the polymorphic reactive-set handle (subscribe only)
//! - `ValueStream<T>`: a plain single-value push-stream subject, used at the
//!   bridge and sink boundaries
//!
//! # Contract
//!
//! On every stream, each token's event sequence matches
//! `Add · Update* · Delete?`. A new subscriber first receives one replay
//! batch containing an Add per currently active lifetime, then live batches.
//! An operator emits at most one downstream batch per upstream batch.

#![no_std]

extern crate alloc;

pub mod change;
pub mod error;
pub mod membership;
pub mod observer;
pub mod outlet;
pub mod stream;
pub mod subscription;
pub mod token;

pub use change::{Change, ChangeBatch, ChangeBatchExt};
pub use error::{Error, Result};
pub use membership::Membership;
pub use observer::{SetObserver, SharedObserver};
pub use outlet::{Outlet, SetHandle};
pub use stream::{SharedValueObserver, ValueObserver, ValueSource, ValueStream};
pub use subscription::Subscription;
pub use token::Token;
