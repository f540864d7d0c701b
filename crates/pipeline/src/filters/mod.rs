//! Filter implementations for recommendation tables.

pub mod seen_items;

pub use seen_items::{filter_seen_items, SeenItemsFilter};
