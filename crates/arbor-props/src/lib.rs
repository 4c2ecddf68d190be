//! Property overlay for Arbor.
//!
//! A [`Property`] carries up to two raw values: a *structure* value scoped to
//! one sibling and a *resource* value shared by all siblings of the content.
//! The structure value takes precedence. Values can be decoded as `|`-delimited
//! lists or `key=value` maps via the [`codec`] module, whose text format is a
//! durable storage contract.
//!
//! Inheritance ("search up parent folders") is implemented by
//! [`resolve_property`] over any [`PropertySource`]: the first resource on
//! the way to the root that has a value wins entirely.

pub mod codec;
pub mod error;
pub mod property;
pub mod resolve;

pub use codec::{decode_list, decode_map, encode_list, encode_map};
pub use error::{PropertyError, Result};
pub use property::{Property, PropertyScope, DELETE_VALUE};
pub use resolve::{resolve_all, resolve_property, resolve_value, PropertySource};
