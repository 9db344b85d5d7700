//! SQL query implementations.
//!
//! - [`binding`]: atomic claim-or-lookup of token bindings
//! - [`material`]: material URL lookups

pub mod binding;
pub mod material;
