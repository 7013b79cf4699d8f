//! Command implementations.

pub mod start;
