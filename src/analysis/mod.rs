//! Analysis modules.
//!
//! Grouping of evaluation records and the cumulative top-N statistics
//! computed from them.

pub mod aggregator;

pub use aggregator::*;
