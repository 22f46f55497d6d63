//! Sources: nodes that introduce lifetimes into a graph.

mod constant;
mod mutable;

pub use constant::constant;
pub use mutable::MutableSet;
