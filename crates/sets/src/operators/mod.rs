//! Operators: nodes that translate upstream lifetimes into downstream ones.
//!
//! - Filter: admission tracking, upstream tokens pass through
//! - Map: pure projection, 1:1 lifetimes
//! - Join / left join: many-to-many keyed match, fresh pair tokens
//! - Group-by: a nested reactive set per key
//! - Flat-map: nested subscription management over reactive or keyed-array
//!   children

mod filter;
mod flat_map;
mod flat_map_keyed;
mod group_by;
mod join;
mod left_join;
mod map;

pub use filter::filter;
pub use flat_map::flat_map_set;
pub use flat_map_keyed::flat_map_array;
pub use group_by::group_by;
pub use join::join;
pub use left_join::left_join;
pub use map::map;
