//! Persistent storage of aggregated datums.
//!
//! [`Storage`] keeps one directory per pair, holding gzip-compressed CSV
//! files named `{interval}__{first}_{last}.gz` where `first` and `last` are
//! the epoch-second timestamps of the window's boundary rows. Storing new
//! datums merges them into a connecting window file when one exists,
//! deduplicating by timestamp with the newer row winning.

#![forbid(unsafe_code)]

mod storage;

pub use storage::{Result, Storage, StorageError};
