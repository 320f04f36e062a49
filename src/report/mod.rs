//! Report rendering.
//!
//! Turns labelled cumulative tables into Markdown, JSON or CSV.

pub mod generator;

pub use generator::*;
