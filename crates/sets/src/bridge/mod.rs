//! Bridges: adapters from foreign push-streams to reactive sets.

mod multi;
mod single;
mod snapshots;

pub use multi::multi_lifetime;
pub use single::single_lifetime;
pub use snapshots::from_snapshots;
