//! Types library for the live depth timeline
//!
//! Value types shared by the timeline engine and the host UI that renders
//! it. Everything here is plain data: validated on construction and never
//! mutated once it is part of a snapshot.
//!
//! # Modules
//! - `ids`: Feed identifiers (FeedName)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `level`: Price levels, sides and color weights
//! - `ladder`: Sorted ladders and snapshots
//! - `trade`: Trade ticks
//! - `errors`: Level validation errors

pub mod errors;
pub mod ids;
pub mod ladder;
pub mod level;
pub mod numeric;
pub mod trade;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::ladder::*;
    pub use crate::level::*;
    pub use crate::numeric::*;
    pub use crate::trade::*;
}
