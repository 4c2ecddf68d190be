//! Resource filter algebra for Arbor.
//!
//! A [`ResourceFilter`] is an immutable predicate over [`Resource`] attributes
//! used to express repository queries. Every `add_*` method returns a new
//! filter with one more constraint and a recomputed cache key; two filters
//! with the same key are interchangeable for caching.
//!
//! # Key Types
//!
//! - [`ResourceFilter`] — The predicate and its cache key
//! - [`Constraint`] — Required or excluded value of one attribute
//! - [`TimeRange`] — Inclusive date range constraint
//! - [`presets`] — Named filters such as [`ALL`] and [`presets::DEFAULT`]
//!
//! [`Resource`]: arbor_types::Resource

pub mod filter;
pub mod presets;

pub use filter::{Constraint, ResourceFilter, TimeRange};
pub use presets::ALL;
