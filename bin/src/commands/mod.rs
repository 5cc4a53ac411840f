//! CLI command implementations.

pub(crate) mod list;
pub(crate) mod retrieve;
pub(crate) mod update;
