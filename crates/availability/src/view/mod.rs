//! Presentation helpers applied after aggregation.
//!
//! Nothing here touches the cache: filters work on copies of the registry
//! output.

mod filter;
mod table;

pub use filter::{effective_floor, filter_from, time_columns, EffectiveFloor, TimeFloor};
pub use table::{CourtRow, VenueTable, UNNAMED_COURT};
