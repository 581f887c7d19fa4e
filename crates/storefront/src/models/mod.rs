//! Wire and domain models for the storefront.
//!
//! These mirror the rows served by the hosted table store. Models are plain
//! data; all I/O lives in [`crate::store`].

pub mod cart;
pub mod product;

pub use cart::{CartLine, ProductSnapshot};
pub use product::{Product, Review};
