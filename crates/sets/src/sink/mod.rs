//! Sinks: terminal consumers of a reactive set.

mod count;
mod snapshot;
mod view;

pub use count::count_stream;
pub use snapshot::snapshot_stream;
pub use view::{materialize, MaterializedView};
