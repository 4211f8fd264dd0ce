//! Core domain types: orders, group keys, and aggregate rows

pub mod aggregate;
pub mod order;

pub use aggregate::*;
pub use order::*;
